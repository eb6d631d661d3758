// estport_core/src/port/descriptor.rs

use std::fmt;

use nalgebra::DMatrix;

use crate::error::{PortError, PortResult};
use crate::models::ModelSpec;
use crate::types::{Dimensions, State};

/// Where a descriptor sits in its `Uninitialized -> Ready -> Terminated` lifecycle.
///
/// The discriminants are part of the module ABI (see `loader::abi::RawPort`).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortPhase {
    #[default]
    Uninitialized = 0,
    Ready = 1,
    Terminated = 2,
}

impl PortPhase {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PortPhase::Uninitialized),
            1 => Some(PortPhase::Ready),
            2 => Some(PortPhase::Terminated),
            _ => None,
        }
    }
}

impl fmt::Display for PortPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortPhase::Uninitialized => write!(f, "uninitialized"),
            PortPhase::Ready => write!(f, "ready"),
            PortPhase::Terminated => write!(f, "terminated"),
        }
    }
}

/// Scalar configuration fixed at Initialize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortConfig {
    pub nx: usize,
    pub nz: usize,
    /// Number of discrete steps covered by the look-ahead prediction.
    pub predict_step: i32,
    /// Discrete time step between two observations.
    pub interval: f64,
    /// Look-ahead horizon used by the prediction hook.
    pub predict_time: f64,
}

impl PortConfig {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            nx: self.nx,
            nz: self.nz,
        }
    }
}

/// The seven model matrices. Shapes are derived from `Nx`/`Nz`:
/// `F, G, P, Q` are `Nx x Nx`, `B` is `Nx x 1`, `H` is `Nz x Nx`, `R` is `Nz x Nz`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMatrices {
    pub f: DMatrix<f64>,
    pub g: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub h: DMatrix<f64>,
    pub p: DMatrix<f64>,
    pub q: DMatrix<f64>,
    pub r: DMatrix<f64>,
}

impl ModelMatrices {
    /// Checks every matrix against the shape implied by `dims`.
    pub fn validate(&self, model: &str, dims: Dimensions) -> PortResult<()> {
        let Dimensions { nx, nz } = dims;
        let expected = [
            ("F", &self.f, (nx, nx)),
            ("G", &self.g, (nx, nx)),
            ("B", &self.b, (nx, 1)),
            ("H", &self.h, (nz, nx)),
            ("P", &self.p, (nx, nx)),
            ("Q", &self.q, (nx, nx)),
            ("R", &self.r, (nz, nz)),
        ];
        for (name, matrix, shape) in expected {
            if matrix.shape() != shape {
                return Err(PortError::invalid_model(
                    model,
                    format!(
                        "Matrix_{name} is {}x{}, expected {}x{}",
                        matrix.nrows(),
                        matrix.ncols(),
                        shape.0,
                        shape.1
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Everything a descriptor owns while it is `Ready`, as one aggregate value.
///
/// It is built in a single fallible step by [`PortBuffers::allocate`] and
/// released in a single step when the descriptor is terminated.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBuffers {
    pub name: String,
    pub introduction: String,
    pub config: PortConfig,

    pub estimated_state: State,
    pub predicted_state: State,
    pub current_observation: State,
    pub predicted_observation: State,

    pub matrices: ModelMatrices,

    pub int_par: Vec<i32>,
    pub double_par: Vec<f64>,

    pub current_timestamp: f64,
    pub observation_timestamp: f64,
    pub state_update_timestamp: f64,

    /// Number of completed Step calls.
    pub steps: u64,
}

/// Read-only copy of a descriptor's contents. Never aliases the live buffers.
pub type PortSnapshot = PortBuffers;

impl PortBuffers {
    /// Builds the owned aggregate for a model. Every buffer is reserved
    /// fallibly, so an allocation failure surfaces as `PortError::Allocation`.
    pub fn allocate(spec: &ModelSpec) -> PortResult<Self> {
        spec.validate()?;
        let nz = spec.config.nz;

        Ok(Self {
            name: spec.name.clone(),
            introduction: spec.introduction.clone(),
            config: spec.config,
            estimated_state: State::from_vec(try_copy("EstimatedState", &spec.initial_state)?),
            predicted_state: State::from_vec(try_copy("PredictedState", &spec.initial_state)?),
            current_observation: State::from_vec(try_zeroed("CurrentObservation", nz)?),
            predicted_observation: State::from_vec(try_zeroed("PredictedObservation", nz)?),
            matrices: ModelMatrices {
                f: try_matrix("Matrix_F", &spec.matrices.f)?,
                g: try_matrix("Matrix_G", &spec.matrices.g)?,
                b: try_matrix("Matrix_B", &spec.matrices.b)?,
                h: try_matrix("Matrix_H", &spec.matrices.h)?,
                p: try_matrix("Matrix_P", &spec.matrices.p)?,
                q: try_matrix("Matrix_Q", &spec.matrices.q)?,
                r: try_matrix("Matrix_R", &spec.matrices.r)?,
            },
            int_par: spec.int_par.clone(),
            double_par: spec.double_par.clone(),
            current_timestamp: 0.0,
            observation_timestamp: 0.0,
            state_update_timestamp: 0.0,
            steps: 0,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.config.dimensions()
    }
}

fn try_zeroed(what: &str, len: usize) -> PortResult<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| PortError::Allocation {
        what: what.to_string(),
        len,
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

fn try_copy(what: &str, src: &[f64]) -> PortResult<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| PortError::Allocation {
            what: what.to_string(),
            len: src.len(),
        })?;
    buf.extend_from_slice(src);
    Ok(buf)
}

fn try_matrix(what: &str, src: &DMatrix<f64>) -> PortResult<DMatrix<f64>> {
    // Both sides are column-major, so a flat copy preserves the layout.
    let data = try_copy(what, src.as_slice())?;
    Ok(DMatrix::from_vec(src.nrows(), src.ncols(), data))
}

/// The caller-owned descriptor handed to every lifecycle operation.
///
/// The shell (phase) always exists; the buffers exist only while `Ready`.
#[derive(Debug, Default)]
pub struct PortDescriptor {
    phase: PortPhase,
    buffers: Option<PortBuffers>,
}

impl PortDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PortPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == PortPhase::Ready
    }

    /// Borrows the buffers, or reports a lifecycle error naming `operation`.
    pub fn buffers(&self, operation: &'static str) -> PortResult<&PortBuffers> {
        match (self.phase, &self.buffers) {
            (PortPhase::Ready, Some(buffers)) => Ok(buffers),
            (phase, _) => Err(PortError::Lifecycle { operation, phase }),
        }
    }

    pub fn buffers_mut(&mut self, operation: &'static str) -> PortResult<&mut PortBuffers> {
        match (self.phase, &mut self.buffers) {
            (PortPhase::Ready, Some(buffers)) => Ok(buffers),
            (phase, _) => Err(PortError::Lifecycle { operation, phase }),
        }
    }

    pub fn dimensions(&self) -> PortResult<Dimensions> {
        Ok(self.buffers("read dimensions")?.dimensions())
    }

    pub fn snapshot(&self) -> PortResult<PortSnapshot> {
        Ok(self.buffers("snapshot")?.clone())
    }

    /// `Uninitialized -> Ready`. A second Initialize is rejected.
    pub(crate) fn install(&mut self, buffers: PortBuffers) -> PortResult<()> {
        if self.phase != PortPhase::Uninitialized {
            return Err(PortError::Lifecycle {
                operation: "initialize",
                phase: self.phase,
            });
        }
        self.buffers = Some(buffers);
        self.phase = PortPhase::Ready;
        Ok(())
    }

    /// `Ready -> Terminated`. Hands the buffers back so the caller can run
    /// teardown before they drop; a second Terminate is rejected.
    pub(crate) fn release(&mut self) -> PortResult<PortBuffers> {
        match (self.phase, self.buffers.take()) {
            (PortPhase::Ready, Some(buffers)) => {
                self.phase = PortPhase::Terminated;
                Ok(buffers)
            }
            (phase, buffers) => {
                self.buffers = buffers;
                Err(PortError::Lifecycle {
                    operation: "terminate",
                    phase,
                })
            }
        }
    }
}
