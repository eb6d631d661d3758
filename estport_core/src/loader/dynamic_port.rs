// estport_core/src/loader/dynamic_port.rs

use tracing::{debug, info};

use super::abi::{LifecycleSymbols, PortStatus, RawPort, PORT_ABI_VERSION};
use crate::error::{PortError, PortResult};
use crate::port::{EstimatorPort, PortPhase, PortVariant};
use crate::types::{Dimensions, State};

/// An [`EstimatorPort`] whose lifecycle runs inside a loaded module.
///
/// Lifecycle order and observation length are checked here against the
/// [`RawPort`] header before anything crosses the boundary, so a misuse
/// never reaches module code.
#[derive(Debug, Clone, Copy)]
pub struct DynamicPort<'m> {
    model: &'m str,
    symbols: &'m LifecycleSymbols,
    variant: PortVariant,
}

impl<'m> DynamicPort<'m> {
    /// # Safety
    ///
    /// Every function pointer in `symbols` must stay callable for `'m` and
    /// must implement the lifecycle contract declared in [`super::abi`].
    pub unsafe fn from_symbols(
        model: &'m str,
        symbols: &'m LifecycleSymbols,
        variant: PortVariant,
    ) -> Self {
        Self {
            model,
            symbols,
            variant,
        }
    }

    /// Maps a status code back onto the error the module raised. `timestamp`
    /// is the Step time, if the call was a Step.
    fn check_status(
        &self,
        symbol: &str,
        operation: &'static str,
        status: i32,
        raw: &RawPort,
        timestamp: Option<f64>,
    ) -> PortResult<()> {
        let rejected = |reason: &'static str| -> PortResult<()> {
            Err(PortError::ModuleRejected {
                symbol: format!("{}_{symbol}", self.model),
                reason,
            })
        };
        match PortStatus::from_raw(status) {
            Some(PortStatus::Ok) => Ok(()),
            Some(PortStatus::Timestamp) => match timestamp {
                Some(timestamp) => Err(PortError::NonMonotonicTimestamp {
                    timestamp,
                    previous: raw.timestamp,
                }),
                None => rejected("timestamp runs backwards"),
            },
            Some(PortStatus::Dimension) => rejected(
                "a vector inside the module does not match the Nx/Nz of the handle",
            ),
            Some(PortStatus::Configuration) => rejected("invalid model or port configuration"),
            Some(PortStatus::Lifecycle) => Err(PortError::Lifecycle {
                operation,
                phase: raw.phase(),
            }),
            Some(PortStatus::Resource) => Err(PortError::Allocation {
                what: format!("{}_{symbol} buffers", self.model),
                len: raw.nx as usize,
            }),
            _ => Err(PortError::ModuleCall {
                symbol: format!("{}_{symbol}", self.model),
                status,
            }),
        }
    }

    fn require_phase(
        raw: &RawPort,
        operation: &'static str,
        expected: PortPhase,
    ) -> PortResult<()> {
        let phase = raw.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(PortError::Lifecycle { operation, phase })
        }
    }
}

impl EstimatorPort for DynamicPort<'_> {
    type Descriptor = RawPort;

    fn model_name(&self) -> &str {
        self.model
    }

    fn variant(&self) -> PortVariant {
        self.variant
    }

    fn new_descriptor(&self) -> RawPort {
        RawPort::new(self.variant)
    }

    fn initialize(&mut self, raw: &mut RawPort) -> PortResult<()> {
        Self::require_phase(raw, "initialize", PortPhase::Uninitialized)?;
        raw.abi_version = PORT_ABI_VERSION;
        raw.variant = self.variant.as_raw();

        // SAFETY: `raw` is a live, exclusively borrowed header in the
        // Uninitialized phase, as the symbol requires.
        let status = unsafe { (self.symbols.initialization)(&mut *raw) };
        self.check_status("Initialization", "initialize", status, raw, None)?;

        if raw.phase() != PortPhase::Ready || raw.instance.is_null() {
            return Err(PortError::ModuleCall {
                symbol: format!("{}_Initialization", self.model),
                status,
            });
        }
        info!(
            model = self.model,
            nx = raw.nx,
            nz = raw.nz,
            variant = %self.variant,
            "{} is initialized (dynamic)",
            self.model
        );
        Ok(())
    }

    fn step(
        &mut self,
        raw: &mut RawPort,
        observation: &[f64],
        timestamp: f64,
    ) -> PortResult<State> {
        Self::require_phase(raw, "step", PortPhase::Ready)?;
        let dims = self.dimensions(raw)?;
        if observation.len() != dims.nz {
            return Err(PortError::dimension("observation", dims.nz, observation.len()));
        }

        let mut state = vec![0.0; dims.nx];
        // SAFETY: both slices are valid for the lengths passed alongside them
        // and `raw` is a Ready header produced by this module.
        let status = unsafe {
            (self.symbols.estimator_port)(
                observation.as_ptr(),
                observation.len(),
                timestamp,
                state.as_mut_ptr(),
                state.len(),
                &mut *raw,
            )
        };
        self.check_status("EstimatorPort", "step", status, raw, Some(timestamp))?;

        debug!(model = self.model, t = timestamp, "state = {:?}", state);
        Ok(State::from_vec(state))
    }

    fn terminate(&mut self, raw: &mut RawPort) -> PortResult<()> {
        Self::require_phase(raw, "terminate", PortPhase::Ready)?;
        // SAFETY: `raw` is a Ready header produced by this module.
        let status = unsafe { (self.symbols.termination)(&mut *raw) };
        self.check_status("EstimatorPortTermination", "terminate", status, raw, None)?;
        info!(model = self.model, "EstimatorPort terminated (dynamic)");
        Ok(())
    }

    fn dimensions(&self, raw: &RawPort) -> PortResult<Dimensions> {
        Self::require_phase(raw, "read dimensions", PortPhase::Ready)?;
        Ok(Dimensions {
            nx: raw.nx as usize,
            nz: raw.nz as usize,
        })
    }
}
