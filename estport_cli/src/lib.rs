// estport_cli/src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
