// estport_core/src/types.rs

use nalgebra::DVector;

// --- Core Type Aliases ---
pub type State = DVector<f64>;

/// The two dimensions that fix the shape of every buffer in a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// State dimension (`Nx`).
    pub nx: usize,
    /// Observation dimension (`Nz`).
    pub nz: usize,
}

/// One row of input: a timestamp plus the `Nz`-length observation vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub timestamp: f64,
    pub observation: Vec<f64>,
}

impl ObservationRecord {
    pub fn new(timestamp: f64, observation: Vec<f64>) -> Self {
        Self {
            timestamp,
            observation,
        }
    }
}

/// One row of output: the input timestamp plus the `Nx`-length state estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub timestamp: f64,
    pub state: Vec<f64>,
}
