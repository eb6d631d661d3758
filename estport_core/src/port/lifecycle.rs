// estport_core/src/port/lifecycle.rs

use tracing::{debug, info};

use crate::error::{PortError, PortResult};
use crate::estimation::filters::LinearKalmanFilter;
use crate::estimation::Estimator;
use crate::models::ModelBinding;
use crate::port::{PortBuffers, PortDescriptor, PortPhase, PortVariant};
use crate::types::{Dimensions, State};

/// The lifecycle contract every estimator implementation satisfies.
///
/// The descriptor is allocated by the caller (via [`EstimatorPort::new_descriptor`])
/// and passed to every operation, so independent runs never share buffers.
/// Lifecycle order is enforced: Step before Initialize or after Terminate,
/// a second Initialize and a second Terminate are all rejected.
pub trait EstimatorPort {
    /// The per-run state this implementation operates on.
    type Descriptor;

    /// Name of the bound model.
    fn model_name(&self) -> &str;

    fn variant(&self) -> PortVariant;

    /// A fresh, uninitialized descriptor.
    fn new_descriptor(&self) -> Self::Descriptor;

    /// Allocates and populates the descriptor, then runs algorithm setup.
    fn initialize(&mut self, descriptor: &mut Self::Descriptor) -> PortResult<()>;

    /// Consumes one `Nz`-length observation and returns the `Nx`-length estimate.
    /// A wrong-length observation is rejected and leaves the descriptor untouched.
    fn step(
        &mut self,
        descriptor: &mut Self::Descriptor,
        observation: &[f64],
        timestamp: f64,
    ) -> PortResult<State>;

    /// Runs algorithm teardown and releases every buffer of the descriptor.
    fn terminate(&mut self, descriptor: &mut Self::Descriptor) -> PortResult<()>;

    /// `Nx`/`Nz` of a ready descriptor.
    fn dimensions(&self, descriptor: &Self::Descriptor) -> PortResult<Dimensions>;
}

/// An in-process port: a model binding plus the estimator behind it.
#[derive(Debug)]
pub struct NativePort {
    binding: Box<dyn ModelBinding>,
    estimator: Box<dyn Estimator>,
    variant: PortVariant,
}

impl NativePort {
    /// Binds `binding` to the reference Kalman filter, using the binding's own variant.
    pub fn new(binding: Box<dyn ModelBinding>) -> Self {
        let variant = binding.variant();
        Self {
            binding,
            estimator: Box::new(LinearKalmanFilter::new()),
            variant,
        }
    }

    pub fn with_estimator(mut self, estimator: Box<dyn Estimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_variant(mut self, variant: PortVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn binding(&self) -> &dyn ModelBinding {
        self.binding.as_ref()
    }
}

impl EstimatorPort for NativePort {
    type Descriptor = PortDescriptor;

    fn model_name(&self) -> &str {
        self.binding.name()
    }

    fn variant(&self) -> PortVariant {
        self.variant
    }

    fn new_descriptor(&self) -> PortDescriptor {
        PortDescriptor::new()
    }

    fn initialize(&mut self, descriptor: &mut PortDescriptor) -> PortResult<()> {
        if descriptor.phase() != PortPhase::Uninitialized {
            return Err(PortError::Lifecycle {
                operation: "initialize",
                phase: descriptor.phase(),
            });
        }

        let mut buffers = PortBuffers::allocate(&self.binding.spec())?;
        self.estimator
            .initialize(&mut buffers, self.binding.as_hooks())?;

        info!(
            port = %buffers.name,
            introduction = %buffers.introduction,
            nx = buffers.config.nx,
            nz = buffers.config.nz,
            variant = %self.variant,
            estimator = self.estimator.name(),
            "{} is initialized",
            buffers.name
        );
        descriptor.install(buffers)
    }

    fn step(
        &mut self,
        descriptor: &mut PortDescriptor,
        observation: &[f64],
        timestamp: f64,
    ) -> PortResult<State> {
        let hooks = self.binding.as_hooks();
        let port = descriptor.buffers_mut("step")?;

        let nz = port.config.nz;
        if observation.len() != nz {
            return Err(PortError::dimension("observation", nz, observation.len()));
        }
        let now = self.variant.resolve_timestamp(port, timestamp)?;

        // The step runs on a staged copy that replaces the buffers only on
        // success, so a failed Step leaves the descriptor as it was.
        let mut staged = port.clone();
        staged.current_observation.copy_from_slice(observation);
        self.variant.stamp_observation(&mut staged, now);
        self.estimator.estimate(&mut staged, hooks)?;
        staged.state_update_timestamp = staged.current_timestamp;
        staged.steps += 1;
        *port = staged;

        debug!(
            port = %port.name,
            step = port.steps,
            t = now,
            "state = {:?}",
            port.estimated_state.as_slice()
        );
        Ok(port.estimated_state.clone())
    }

    fn terminate(&mut self, descriptor: &mut PortDescriptor) -> PortResult<()> {
        let mut buffers = descriptor.release()?;
        self.estimator.terminate(&mut buffers);
        info!(port = %buffers.name, steps = buffers.steps, "EstimatorPort terminated");
        // `buffers` is the only owner of every vector and matrix; dropping it
        // here is the single release.
        drop(buffers);
        Ok(())
    }

    fn dimensions(&self, descriptor: &PortDescriptor) -> PortResult<Dimensions> {
        descriptor.dimensions()
    }
}
