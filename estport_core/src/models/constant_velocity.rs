// estport_core/src/models/constant_velocity.rs

use nalgebra::DMatrix;

use crate::models::{ModelBinding, ModelSpec, StateSpaceHooks};
use crate::port::{ModelMatrices, PortBuffers, PortConfig, PortVariant};
use crate::types::State;

/// Model name of the value-only reference binding.
pub const VALUE_ONLY_MODEL: &str = "StateSpaceModel1";
/// Model name of the timestamped reference binding.
pub const TIMESTAMPED_MODEL: &str = "StateSpaceModel_Demo";

/// `PortName` written into the descriptor by both reference bindings.
pub const PORT_NAME: &str = "Tested Estimator v0.00";
/// `PortIntroduction` written into the descriptor by both reference bindings.
pub const PORT_INTRODUCTION: &str = "For Reference";

const NX: usize = 4;
const NZ: usize = 2;
const PREDICT_STEP: i32 = 2;
const INTERVAL: f64 = 0.005;
const PREDICT_TIME: f64 = 0.01;

/// A planar constant-velocity model.
///
/// State layout is `[px, vx, py, vy]`; the observation is the position pair
/// `[px, py]`. Both reference bindings share these matrices and differ only
/// in the Step variant they are exported with.
#[derive(Debug, Clone)]
pub struct ConstantVelocity2d {
    name: &'static str,
    variant: PortVariant,
}

impl ConstantVelocity2d {
    pub fn value_only() -> Self {
        Self {
            name: VALUE_ONLY_MODEL,
            variant: PortVariant::ValueOnly,
        }
    }

    pub fn timestamped() -> Self {
        Self {
            name: TIMESTAMPED_MODEL,
            variant: PortVariant::Timestamped,
        }
    }
}

/// Moves both position components forward by `dt` at constant velocity.
fn advance(x: &State, dt: f64) -> State {
    State::from_vec(vec![x[0] + dt * x[1], x[1], x[2] + dt * x[3], x[3]])
}

impl StateSpaceHooks for ConstantVelocity2d {
    fn state_transition(&self, x: &State, port: &PortBuffers) -> State {
        advance(x, port.config.interval)
    }

    fn observation(&self, x: &State, port: &PortBuffers) -> State {
        let dt = port.config.interval;
        State::from_vec(vec![x[0] + dt * x[1], x[2] + dt * x[3]])
    }

    fn prediction(&self, x: &State, port: &PortBuffers) -> State {
        advance(x, port.config.predict_time)
    }
}

impl ModelBinding for ConstantVelocity2d {
    fn name(&self) -> &str {
        self.name
    }

    fn variant(&self) -> PortVariant {
        self.variant
    }

    fn spec(&self) -> ModelSpec {
        #[rustfmt::skip]
        let f = DMatrix::from_row_slice(NX, NX, &[
            1.0, INTERVAL, 0.0, 0.0,
            0.0, 1.0,      0.0, 0.0,
            0.0, 0.0,      1.0, INTERVAL,
            0.0, 0.0,      0.0, 1.0,
        ]);
        #[rustfmt::skip]
        let h = DMatrix::from_row_slice(NZ, NX, &[
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        ]);

        ModelSpec {
            name: PORT_NAME.to_string(),
            introduction: PORT_INTRODUCTION.to_string(),
            config: PortConfig {
                nx: NX,
                nz: NZ,
                predict_step: PREDICT_STEP,
                interval: INTERVAL,
                predict_time: PREDICT_TIME,
            },
            initial_state: vec![1.0, 0.0, 1.0, 0.0],
            matrices: ModelMatrices {
                f,
                g: DMatrix::identity(NX, NX),
                b: DMatrix::zeros(NX, 1),
                h,
                p: DMatrix::identity(NX, NX),
                q: DMatrix::identity(NX, NX),
                r: DMatrix::identity(NZ, NZ),
            },
            int_par: vec![1],
            double_par: vec![1.0],
        }
    }

    fn as_hooks(&self) -> &dyn StateSpaceHooks {
        self
    }
}
