// estport_core/src/lib.rs

// Public modules of the estimator port library.
pub mod bridge;
pub mod config;
pub mod error;
pub mod estimation;
pub mod harness;
pub mod io;
pub mod loader;
pub mod models;
pub mod port;
pub mod prelude;
pub mod types;
