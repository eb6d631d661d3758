// estport_core/src/models/mod.rs

use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::error::{PortError, PortResult};
use crate::port::{ModelMatrices, PortBuffers, PortConfig, PortVariant};
use crate::types::State;

pub mod constant_velocity;
pub mod linear;

// --- HOOKS TRAIT ---
// The three pure transforms a model supplies to the algorithm behind the port.
/// The capability interface a model binding hands to the estimator.
///
/// Each hook is a pure function of a state vector and the (read-only)
/// descriptor contents. Only the estimator calls these; the harness never does.
pub trait StateSpaceHooks: Debug + Send + Sync {
    /// `x_k = f(x_{k-1})`: advances a state by one `Intervel`.
    fn state_transition(&self, x: &State, port: &PortBuffers) -> State;

    /// `z_k = h(x_{k-1})`: the observation expected at the next step, computed
    /// from the previous estimate. The result has length `Nz`.
    fn observation(&self, x: &State, port: &PortBuffers) -> State;

    /// `x(t + PredictTime) = p(x_t)`: look-ahead prediction.
    fn prediction(&self, x: &State, port: &PortBuffers) -> State;
}

// --- MODEL BINDING TRAIT ---
/// A named, self-contained state-space model that can populate a descriptor.
///
/// Swapping a binding swaps the matrices and hooks, and nothing in the harness.
pub trait ModelBinding: StateSpaceHooks + DynClone {
    /// The model name, also the prefix of its exported module symbols.
    fn name(&self) -> &str;

    /// Everything Initialize needs to fill a descriptor.
    fn spec(&self) -> ModelSpec;

    /// The Step flavour this binding is exported with.
    fn variant(&self) -> PortVariant {
        PortVariant::Timestamped
    }

    /// Upcast used when handing the hooks to an estimator.
    fn as_hooks(&self) -> &dyn StateSpaceHooks;
}

dyn_clone::clone_trait_object!(ModelBinding);

/// The full initial contents of a descriptor for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub introduction: String,
    pub config: PortConfig,
    pub initial_state: Vec<f64>,
    pub matrices: ModelMatrices,
    pub int_par: Vec<i32>,
    pub double_par: Vec<f64>,
}

impl ModelSpec {
    /// Checks that every declared size agrees with `Nx`/`Nz`.
    pub fn validate(&self) -> PortResult<()> {
        if self.config.nx == 0 || self.config.nz == 0 {
            return Err(PortError::invalid_model(
                &self.name,
                format!(
                    "dimensions must be positive (Nx={}, Nz={})",
                    self.config.nx, self.config.nz
                ),
            ));
        }
        if !(self.config.interval.is_finite() && self.config.interval > 0.0) {
            return Err(PortError::invalid_model(
                &self.name,
                format!("Intervel must be positive, got {}", self.config.interval),
            ));
        }
        if self.initial_state.len() != self.config.nx {
            return Err(PortError::invalid_model(
                &self.name,
                format!(
                    "initial state has {} elements, expected Nx={}",
                    self.initial_state.len(),
                    self.config.nx
                ),
            ));
        }
        self.matrices
            .validate(&self.name, self.config.dimensions())
    }
}

// --- Registry ---

/// Names of the bindings that ship with the crate.
pub const REFERENCE_MODELS: &[&str] = &[
    constant_velocity::VALUE_ONLY_MODEL,
    constant_velocity::TIMESTAMPED_MODEL,
];

/// Resolves a shipped binding by its model name.
pub fn binding_by_name(name: &str) -> PortResult<Box<dyn ModelBinding>> {
    match name {
        constant_velocity::VALUE_ONLY_MODEL => {
            Ok(Box::new(constant_velocity::ConstantVelocity2d::value_only()))
        }
        constant_velocity::TIMESTAMPED_MODEL => {
            Ok(Box::new(constant_velocity::ConstantVelocity2d::timestamped()))
        }
        other => Err(PortError::UnknownModel(other.to_string())),
    }
}
