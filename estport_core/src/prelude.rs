// estport_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::Estimator;
pub use crate::models::{ModelBinding, StateSpaceHooks};
pub use crate::port::EstimatorPort;

// --- Core Data Structures ---
pub use crate::error::{ErrorKind, PortError, PortResult};
pub use crate::port::{PortDescriptor, PortPhase, PortSnapshot, PortVariant};
pub use crate::types::{Dimensions, ObservationRecord, ResultRecord, State};

// --- Ports, Harness and Bridge ---
pub use crate::bridge::{BridgeArg, BridgeError, BridgeReply, CommandBridge};
pub use crate::harness::{ColumnMapping, ExecutionHarness};
pub use crate::loader::{DynamicPort, LoadedModule};
pub use crate::port::NativePort;

// --- Concrete Implementations (Export common ones for convenience) ---
pub use crate::config::{Backend, RunConfig};
pub use crate::estimation::filters::LinearKalmanFilter;
pub use crate::models::constant_velocity::ConstantVelocity2d;
pub use crate::models::linear::{LinearModel, LinearModelConfig};
