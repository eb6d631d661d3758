// estport_core/src/loader/mod.rs

//! Runtime loading of estimator modules.
//!
//! A module is a shared library exporting `<Model>_Initialization`,
//! `<Model>_EstimatorPort` and `<Model>_EstimatorPortTermination` for each
//! model it carries. [`LoadedModule`] resolves them, [`DynamicPort`] drives
//! them through the ordinary [`EstimatorPort`](crate::port::EstimatorPort)
//! contract, and [`export`] is what a module uses to produce them.

pub mod abi;
pub mod dynamic_port;
pub mod export;
pub mod module;

pub use abi::{LifecycleSymbols, PortStatus, RawPort, SymbolNames, PORT_ABI_VERSION};
pub use dynamic_port::DynamicPort;
pub use module::{module_file_name, LoadedModule};
