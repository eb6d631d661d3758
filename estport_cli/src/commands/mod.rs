// estport_cli/src/commands/mod.rs

pub mod bridge;
pub mod inspect;
pub mod run;
pub mod simulate;

use anyhow::Result;

use crate::cli::{Cli, Command};
use crate::config;

pub fn dispatch(cli: Cli) -> Result<()> {
    let mut run_config = config::load(&cli.config)?;
    match cli.command {
        Command::Run(args) => {
            args.apply(&mut run_config);
            let path = run::execute(&run_config)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Inspect(args) => {
            args.apply(&mut run_config);
            inspect::run(&run_config)
        }
        Command::Simulate(args) => simulate::run(&args, &run_config),
        Command::Bridge(args) => {
            args.apply(&mut run_config);
            bridge::run(&run_config)
        }
        Command::Config => {
            print!("{}", config::render(&run_config)?);
            Ok(())
        }
    }
}
