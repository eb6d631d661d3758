// estport_core/src/estimation/filters/kalman.rs

use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::error::{PortError, PortResult};
use crate::estimation::Estimator;
use crate::models::StateSpaceHooks;
use crate::port::PortBuffers;

/// A linear Kalman filter driven by the model hooks and the descriptor matrices.
///
/// The mean is propagated through the hooks, the covariance through `F`,
/// `G`, `Q`, `H` and `R`. All filter state lives in the descriptor, so two
/// descriptors never share anything through this struct.
#[derive(Debug, Clone, Default)]
pub struct LinearKalmanFilter {
    /// Steps whose innovation covariance could not be inverted.
    skipped_updates: u64,
}

impl LinearKalmanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped_updates(&self) -> u64 {
        self.skipped_updates
    }
}

/// Hooks are trusted code, but a model that returns the wrong length would
/// corrupt the descriptor, so their outputs are checked once per call.
fn check_len(what: &str, expected: usize, received: usize) -> PortResult<()> {
    if expected == received {
        Ok(())
    } else {
        Err(PortError::dimension(what, expected, received))
    }
}

impl Estimator for LinearKalmanFilter {
    fn name(&self) -> &str {
        "linear-kalman"
    }

    fn initialize(
        &mut self,
        port: &mut PortBuffers,
        hooks: &dyn StateSpaceHooks,
    ) -> PortResult<()> {
        let dims = port.dimensions();
        let x0 = port.estimated_state.clone();

        check_len(
            "state transition hook output",
            dims.nx,
            hooks.state_transition(&x0, port).len(),
        )?;
        let z0 = hooks.observation(&x0, port);
        check_len("observation hook output", dims.nz, z0.len())?;
        check_len(
            "prediction hook output",
            dims.nx,
            hooks.prediction(&x0, port).len(),
        )?;

        port.predicted_observation = z0;
        self.skipped_updates = 0;
        Ok(())
    }

    fn estimate(&mut self, port: &mut PortBuffers, hooks: &dyn StateSpaceHooks) -> PortResult<()> {
        let dims = port.dimensions();
        let x_prev = port.estimated_state.clone();

        // --- Predict ---
        let x_pred = hooks.state_transition(&x_prev, port);
        check_len("state transition hook output", dims.nx, x_pred.len())?;
        let z_pred = hooks.observation(&x_prev, port);
        check_len("observation hook output", dims.nz, z_pred.len())?;

        let m = &port.matrices;
        // P⁻ = F P Fᵀ + G Q Gᵀ
        let p_pred = &m.f * &m.p * m.f.transpose() + &m.g * &m.q * m.g.transpose();

        // --- Update ---
        let innovation = &port.current_observation - &z_pred;
        let s = &m.h * &p_pred * m.h.transpose() + &m.r;

        let (x_post, p_post) = match s.try_inverse() {
            Some(s_inv) => {
                let k_gain = &p_pred * m.h.transpose() * s_inv;
                let x_post = &x_pred + &k_gain * innovation;
                let identity = DMatrix::<f64>::identity(dims.nx, dims.nx);
                let p_post = (identity - &k_gain * &m.h) * &p_pred;
                (x_post, p_post)
            }
            None => {
                // Keep the prediction rather than fusing a degenerate measurement.
                self.skipped_updates += 1;
                warn!(
                    port = %port.name,
                    step = port.steps,
                    "innovation covariance is singular; skipping measurement update"
                );
                (x_pred, p_pred)
            }
        };

        // --- Look ahead ---
        let look_ahead = hooks.prediction(&x_post, port);
        check_len("prediction hook output", dims.nx, look_ahead.len())?;

        port.predicted_observation = z_pred;
        port.estimated_state = x_post;
        port.matrices.p = p_post;
        port.predicted_state = look_ahead;
        Ok(())
    }

    fn terminate(&mut self, port: &mut PortBuffers) {
        debug!(
            port = %port.name,
            steps = port.steps,
            skipped_updates = self.skipped_updates,
            "kalman filter teardown"
        );
    }
}
