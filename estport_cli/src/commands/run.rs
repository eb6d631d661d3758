// estport_cli/src/commands/run.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use estport_core::config::{Backend, RunConfig};
use estport_core::harness::ExecutionHarness;
use estport_core::io::{read_observation_table, write_result_table};
use estport_core::loader::LoadedModule;
use tracing::info;

/// Reads the input table, runs the configured port over it and writes the
/// result table. Returns the path written.
pub fn execute(config: &RunConfig) -> Result<PathBuf> {
    let rows = read_observation_table(&config.input.path, config.input.expected_rows)
        .context("failed to read the observation table")?;
    let harness = ExecutionHarness::new(config.column_mapping());

    let results = match config.port.backend {
        Backend::Native => {
            let mut port = config.native_port()?;
            harness.run_rows(&mut port, &rows)?
        }
        Backend::Dynamic => {
            let module = LoadedModule::open(&config.port.module_path, config.model_name())?;
            let mut port = module.port(config.dynamic_variant());
            harness.run_rows(&mut port, &rows)?
        }
    };
    info!(
        model = config.model_name(),
        backend = %config.port.backend,
        records = results.len(),
        "Estimation complete"
    );

    let path = write_result_table(&config.output.directory, &results, config.output.precision)
        .context("failed to write the result table")?;
    Ok(path)
}
