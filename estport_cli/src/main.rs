// estport_cli/src/main.rs

use std::process;

use clap::Parser;

use estport_cli::cli::Cli;
use estport_cli::{commands, logging};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = commands::dispatch(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
