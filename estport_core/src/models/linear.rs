// estport_core/src/models/linear.rs

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{PortError, PortResult};
use crate::models::{ModelBinding, ModelSpec, StateSpaceHooks};
use crate::port::{ModelMatrices, PortBuffers, PortConfig, PortVariant};
use crate::types::State;

fn default_predict_step() -> i32 {
    1
}

/// A linear model described entirely by data, as found in a `[model]` table.
///
/// Matrices are given row-major. `G`, `P` and `Q` default to identity, `B`
/// to zeros, `R` to identity, and `predict_time` to `predict_step * interval`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinearModelConfig {
    pub name: String,
    #[serde(default)]
    pub introduction: String,
    pub nx: usize,
    pub nz: usize,
    #[serde(default = "default_predict_step")]
    pub predict_step: i32,
    pub interval: f64,
    #[serde(default)]
    pub predict_time: Option<f64>,
    #[serde(default)]
    pub variant: PortVariant,
    pub initial_state: Vec<f64>,
    pub f: Vec<f64>,
    pub h: Vec<f64>,
    #[serde(default)]
    pub g: Option<Vec<f64>>,
    #[serde(default)]
    pub b: Option<Vec<f64>>,
    #[serde(default)]
    pub p: Option<Vec<f64>>,
    #[serde(default)]
    pub q: Option<Vec<f64>>,
    #[serde(default)]
    pub r: Option<Vec<f64>>,
    #[serde(default)]
    pub int_par: Vec<i32>,
    #[serde(default)]
    pub double_par: Vec<f64>,
}

/// A binding whose hooks are the matrices themselves:
/// `f(x) = F x`, `h(x) = H F x`, `p(x) = F^PredictStep x`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    spec: ModelSpec,
    variant: PortVariant,
}

impl LinearModel {
    pub fn from_config(config: &LinearModelConfig) -> PortResult<Self> {
        let (nx, nz) = (config.nx, config.nz);
        let name = config.name.as_str();
        let matrix = |label: &str,
                      data: Option<&Vec<f64>>,
                      rows: usize,
                      cols: usize,
                      fallback: fn(usize, usize) -> DMatrix<f64>| {
            let invalid = |reason: String| PortError::invalid_model(name, reason);
            let expected = rows.checked_mul(cols);
            match data {
                Some(values) if Some(values.len()) == expected => {
                    Ok(DMatrix::from_row_slice(rows, cols, values))
                }
                Some(values) => Err(invalid(format!(
                    "Matrix_{label} has {} elements, expected {rows}x{cols}",
                    values.len()
                ))),
                None => match expected.and_then(|n| n.checked_mul(std::mem::size_of::<f64>())) {
                    Some(bytes) if bytes <= isize::MAX as usize => Ok(fallback(rows, cols)),
                    _ => Err(invalid(format!(
                        "default Matrix_{label} of {rows}x{cols} is too large"
                    ))),
                },
            }
        };

        let matrices = ModelMatrices {
            f: matrix("F", Some(&config.f), nx, nx, DMatrix::identity)?,
            h: matrix("H", Some(&config.h), nz, nx, DMatrix::zeros)?,
            g: matrix("G", config.g.as_ref(), nx, nx, DMatrix::identity)?,
            b: matrix("B", config.b.as_ref(), nx, 1, DMatrix::zeros)?,
            p: matrix("P", config.p.as_ref(), nx, nx, DMatrix::identity)?,
            q: matrix("Q", config.q.as_ref(), nx, nx, DMatrix::identity)?,
            r: matrix("R", config.r.as_ref(), nz, nz, DMatrix::identity)?,
        };

        let spec = ModelSpec {
            name: config.name.clone(),
            introduction: config.introduction.clone(),
            config: PortConfig {
                nx,
                nz,
                predict_step: config.predict_step,
                interval: config.interval,
                predict_time: config
                    .predict_time
                    .unwrap_or(config.predict_step as f64 * config.interval),
            },
            initial_state: config.initial_state.clone(),
            matrices,
            int_par: config.int_par.clone(),
            double_par: config.double_par.clone(),
        };
        spec.validate()?;

        Ok(Self {
            spec,
            variant: config.variant,
        })
    }
}

impl StateSpaceHooks for LinearModel {
    fn state_transition(&self, x: &State, port: &PortBuffers) -> State {
        &port.matrices.f * x
    }

    fn observation(&self, x: &State, port: &PortBuffers) -> State {
        &port.matrices.h * (&port.matrices.f * x)
    }

    fn prediction(&self, x: &State, port: &PortBuffers) -> State {
        let mut ahead = x.clone();
        for _ in 0..port.config.predict_step.max(0) {
            ahead = &port.matrices.f * ahead;
        }
        ahead
    }
}

impl ModelBinding for LinearModel {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn variant(&self) -> PortVariant {
        self.variant
    }

    fn spec(&self) -> ModelSpec {
        self.spec.clone()
    }

    fn as_hooks(&self) -> &dyn StateSpaceHooks {
        self
    }
}
