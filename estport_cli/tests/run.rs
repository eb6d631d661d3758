// estport_cli/tests/run.rs

use std::fs;

use estport_cli::commands::run::execute;
use estport_cli::config;
use estport_core::io::parse_result_row;

#[test]
fn run_command_writes_one_row_per_observation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Trace.txt");
    fs::write(&input, "0.000 1.000 1.0\n0.005 1.005 1.0\n0.010 1.010 1.0\n").unwrap();

    let config_path = dir.path().join("estport.toml");
    fs::write(
        &config_path,
        format!(
            r#"
            [input]
            path = '{}'
            expected_rows = 3

            [output]
            directory = '{}'

            [port]
            model = "StateSpaceModel_Demo"
            "#,
            input.display(),
            dir.path().join("EstimationResult").display()
        ),
    )
    .unwrap();

    let run_config = config::load(&config_path).unwrap();
    let path = execute(&run_config).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("EstimationResult_") && name.ends_with(".txt"));

    let text = fs::read_to_string(&path).unwrap();
    let rows: Vec<_> = text
        .lines()
        .enumerate()
        .map(|(i, line)| parse_result_row(line, &path, i + 1).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].timestamp, 0.01);
    assert!(rows.iter().all(|row| row.state.len() == 4));
}

#[test]
fn wrong_row_count_fails_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Trace.txt");
    fs::write(&input, "0.000 1.000 1.0\n").unwrap();
    let out = dir.path().join("EstimationResult");

    let mut run_config = estport_core::config::RunConfig::default();
    run_config.input.path = input;
    run_config.input.expected_rows = Some(1000);
    run_config.output.directory = out.clone();

    let err = execute(&run_config).unwrap_err();
    assert!(format!("{err:#}").contains("expected 1000 rows, found 1"));
    assert!(!out.exists());
}

#[test]
fn bundled_configs_load_and_run() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let out = tempfile::tempdir().unwrap();
    for name in ["estport.toml", "linear_scalar.toml"] {
        let mut run_config = config::load(&root.join("assets/config").join(name)).unwrap();
        run_config.input.path = root.join(&run_config.input.path);
        run_config.output.directory = out.path().join(name);
        let path = execute(&run_config).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 200, "{name}");
    }
}
