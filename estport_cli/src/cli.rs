// estport_cli/src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use estport_core::config::{Backend, RunConfig};
use estport_core::port::PortVariant;

/// Estport: runs Kalman-family estimators behind a pluggable port.
#[derive(Parser, Debug)]
#[command(name = "estport", version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the TOML run configuration. A missing file means defaults.
    #[arg(short, long, global = true, default_value = "estport.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the estimator over an observation table and write the result table.
    Run(RunArgs),
    /// Initialize a port and print its descriptor.
    Inspect(PortArgs),
    /// Write a synthetic constant-velocity observation table.
    Simulate(SimulateArgs),
    /// Drive a port with text commands read from stdin.
    Bridge(PortArgs),
    /// Print the resolved configuration as TOML.
    Config,
}

/// Port selection overrides shared by every command that builds a port.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PortArgs {
    /// Model name (e.g. StateSpaceModel1, StateSpaceModel_Demo).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Step variant: value-only or timestamped.
    #[arg(long)]
    pub variant: Option<PortVariant>,

    /// Where the estimator runs: native or dynamic.
    #[arg(short, long)]
    pub backend: Option<Backend>,

    /// Path of the shared library to load with the dynamic backend.
    #[arg(long)]
    pub module: Option<PathBuf>,
}

impl PortArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(model) = &self.model {
            config.port.model = model.clone();
        }
        if let Some(variant) = self.variant {
            config.port.variant = Some(variant);
        }
        if let Some(backend) = self.backend {
            config.port.backend = backend;
        }
        if let Some(module) = &self.module {
            config.port.module_path = module.clone();
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// Override the input table path from config.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override the output directory from config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        self.port.apply(config);
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Output table path. Defaults to the configured input path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of rows to generate.
    #[arg(long, default_value_t = 1000)]
    pub rows: usize,

    /// Sampling interval in seconds.
    #[arg(long, default_value_t = 0.005)]
    pub interval: f64,

    /// Standard deviation of the position noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Planar velocity of the simulated target.
    #[arg(long, num_args = 2, default_values_t = [1.0, 0.5])]
    pub velocity: Vec<f64>,

    /// RNG seed; the same seed always yields the same table.
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,
}
