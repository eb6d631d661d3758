// estport_cli/src/commands/bridge.rs

use std::io::{self, BufRead, Write};

use anyhow::Result;
use estport_core::bridge::{BridgeArg, CommandBridge};
use estport_core::config::{Backend, RunConfig};
use estport_core::loader::LoadedModule;
use estport_core::port::EstimatorPort;

/// Splits one REPL line into bridge arguments.
///
/// The first word is the command. Numbers are gathered into one vector,
/// `@<t>` is a scalar timestamp, and any other word is passed through as
/// text so the bridge can report it.
pub fn parse_line(line: &str) -> Vec<BridgeArg> {
    let mut words = line.split_whitespace();
    let mut args = Vec::new();
    if let Some(command) = words.next() {
        args.push(BridgeArg::Text(command.to_string()));
    }

    let mut vector = Vec::new();
    let mut rest = Vec::new();
    for word in words {
        if let Some(t) = word.strip_prefix('@') {
            match t.parse::<f64>() {
                Ok(t) => rest.push(BridgeArg::Scalar(t)),
                Err(_) => rest.push(BridgeArg::Text(word.to_string())),
            }
        } else if let Ok(value) = word.parse::<f64>() {
            vector.push(value);
        } else {
            rest.push(BridgeArg::Text(word.to_string()));
        }
    }
    if !vector.is_empty() {
        args.push(BridgeArg::Vector(vector));
    }
    args.extend(rest);
    args
}

/// Reads commands from `input` until EOF or `quit`, writing one reply or
/// error line per command to `output`.
pub fn repl<P, R, W>(bridge: &mut CommandBridge<P>, input: R, mut output: W) -> Result<()>
where
    P: EstimatorPort,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        match bridge.dispatch(&parse_line(line)) {
            Ok(reply) => writeln!(output, "{reply}")?,
            Err(err) => writeln!(output, "error {err}")?,
        }
    }
    output.flush()?;
    Ok(())
}

pub fn run(config: &RunConfig) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    match config.port.backend {
        Backend::Native => {
            let mut bridge = CommandBridge::new(config.native_port()?);
            repl(&mut bridge, stdin.lock(), stdout.lock())
        }
        Backend::Dynamic => {
            let module = LoadedModule::open(&config.port.module_path, config.model_name())?;
            let mut bridge = CommandBridge::new(module.port(config.dynamic_variant()));
            repl(&mut bridge, stdin.lock(), stdout.lock())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estport_core::models::constant_velocity::ConstantVelocity2d;
    use estport_core::port::NativePort;

    #[test]
    fn numbers_become_one_vector_and_at_marks_time() {
        assert_eq!(
            parse_line("estimate 1.0 2.5 @0.005"),
            vec![
                BridgeArg::Text("estimate".into()),
                BridgeArg::Vector(vec![1.0, 2.5]),
                BridgeArg::Scalar(0.005),
            ]
        );
        assert_eq!(parse_line("  terminate "), vec![BridgeArg::Text("terminate".into())]);
        assert!(parse_line("   ").is_empty());
    }

    #[test]
    fn session_transcript() {
        let mut bridge =
            CommandBridge::new(NativePort::new(Box::new(ConstantVelocity2d::timestamped())));
        let input: &[u8] =
            b"initialize\nestimate 1 1 @0\nestimate 1 2 3\nfly\nterminate\nquit\nterminate\n";
        let mut output = Vec::new();
        repl(&mut bridge, input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "true");
        assert_eq!(lines[1], "[1.000000 0.000000 1.000000 0.000000]");
        assert!(lines[2].starts_with("error EstimatorPortN:dim"));
        assert!(lines[3].starts_with("error EstimatorPortN:unknownCmd"));
        assert_eq!(lines[4], "true");
    }
}
