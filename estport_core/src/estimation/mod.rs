// estport_core/src/estimation/mod.rs

use std::fmt::Debug;

use crate::error::PortResult;
use crate::models::StateSpaceHooks;
use crate::port::PortBuffers;

/// The contract for the algorithm that sits behind the port.
///
/// The port owns the descriptor; the estimator only reads and mutates the
/// buffers it is handed, and reaches the model exclusively through `hooks`.
pub trait Estimator: Debug + Send + Sync {
    /// A short identifier, used in logs.
    fn name(&self) -> &str;

    /// Algorithm-specific setup after the buffers have been populated.
    fn initialize(&mut self, port: &mut PortBuffers, hooks: &dyn StateSpaceHooks)
        -> PortResult<()>;

    /// Consumes `port.current_observation` and refreshes `estimated_state`,
    /// `predicted_state`, `predicted_observation` and the covariance.
    fn estimate(&mut self, port: &mut PortBuffers, hooks: &dyn StateSpaceHooks) -> PortResult<()>;

    /// Algorithm-specific teardown, run just before the buffers are released.
    fn terminate(&mut self, port: &mut PortBuffers);
}

pub mod filters;
