// estport_module/src/lib.rs

//! The runtime-loadable estimator module.
//!
//! Built as a `cdylib`, this exports the lifecycle symbols of both reference
//! bindings. A host opens it with
//! [`LoadedModule::open`](estport_core::loader::LoadedModule::open) and the
//! model name (`StateSpaceModel1` or `StateSpaceModel_Demo`).
#![allow(non_snake_case)]

use estport_core::models::constant_velocity::ConstantVelocity2d;

/// Model names exported by this module.
pub const EXPORTED_MODELS: &[&str] = &["StateSpaceModel1", "StateSpaceModel_Demo"];

estport_core::export_estimator_port! {
    binding: ConstantVelocity2d::value_only(),
    initialization: StateSpaceModel1_Initialization,
    estimator_port: StateSpaceModel1_EstimatorPort,
    termination: StateSpaceModel1_EstimatorPortTermination,
    abi_version: StateSpaceModel1_PortAbiVersion,
}

estport_core::export_estimator_port! {
    binding: ConstantVelocity2d::timestamped(),
    initialization: StateSpaceModel_Demo_Initialization,
    estimator_port: StateSpaceModel_Demo_EstimatorPort,
    termination: StateSpaceModel_Demo_EstimatorPortTermination,
    abi_version: StateSpaceModel_Demo_PortAbiVersion,
}
