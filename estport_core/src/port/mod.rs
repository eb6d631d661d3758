// estport_core/src/port/mod.rs

//! The estimator port: the descriptor every implementation operates on and
//! the three lifecycle operations (Initialize, Step, Terminate).

pub mod descriptor;
pub mod lifecycle;
pub mod variant;

pub use descriptor::{
    ModelMatrices, PortBuffers, PortConfig, PortDescriptor, PortPhase, PortSnapshot,
};
pub use lifecycle::{EstimatorPort, NativePort};
pub use variant::PortVariant;
