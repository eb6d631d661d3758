// estport_core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::port::PortPhase;

/// The four families of failure a run can hit.
///
/// Configuration and module-resolution errors are diagnosable from their
/// message alone. Lifecycle and resource errors are contract violations: the
/// run that produced them must not continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ModuleResolution,
    Lifecycle,
    Resource,
}

/// Every error produced by the port, its loader, the harness and the table I/O.
#[derive(Debug, Error)]
pub enum PortError {
    // --- Configuration ---
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}:{column}: malformed numeric field '{field}'", path.display())]
    MalformedField {
        path: PathBuf,
        line: usize,
        column: usize,
        field: String,
    },

    #[error("{}: expected {expected} rows, found {found}", path.display())]
    RowCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: expected {expected} columns, found {found}", path.display())]
    ColumnCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{what} dimension mismatch: expected {expected}, received {received}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        received: usize,
    },

    #[error("timestamp {timestamp} precedes the previous timestamp {previous}")]
    NonMonotonicTimestamp { timestamp: f64, previous: f64 },

    #[error("invalid model binding '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("unknown model binding '{0}'")]
    UnknownModel(String),

    #[error("module call '{symbol}' rejected its input: {reason}")]
    ModuleRejected { symbol: String, reason: &'static str },

    // --- Module resolution ---
    #[error("failed to load module {}: {reason}", path.display())]
    ModuleNotFound { path: PathBuf, reason: String },

    #[error("module {} does not export required symbol '{symbol}'", path.display())]
    MissingSymbol { path: PathBuf, symbol: String },

    #[error(
        "symbol '{symbol}' in {} reports port ABI version {found}, expected {expected}",
        path.display()
    )]
    SignatureMismatch {
        path: PathBuf,
        symbol: String,
        expected: u32,
        found: u32,
    },

    #[error("module call '{symbol}' returned status {status}")]
    ModuleCall { symbol: String, status: i32 },

    // --- Lifecycle ordering ---
    #[error("cannot {operation}: port is {phase}")]
    Lifecycle {
        operation: &'static str,
        phase: PortPhase,
    },

    // --- Resources ---
    #[error("failed to allocate {what} ({len} elements)")]
    Allocation { what: String, len: usize },
}

impl PortError {
    /// Classifies the error into one of the four propagation families.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortError::Io { .. }
            | PortError::MalformedField { .. }
            | PortError::RowCount { .. }
            | PortError::ColumnCount { .. }
            | PortError::DimensionMismatch { .. }
            | PortError::NonMonotonicTimestamp { .. }
            | PortError::InvalidModel { .. }
            | PortError::UnknownModel(_)
            | PortError::ModuleRejected { .. } => ErrorKind::Configuration,
            PortError::ModuleNotFound { .. }
            | PortError::MissingSymbol { .. }
            | PortError::SignatureMismatch { .. }
            | PortError::ModuleCall { .. } => ErrorKind::ModuleResolution,
            PortError::Lifecycle { .. } => ErrorKind::Lifecycle,
            PortError::Allocation { .. } => ErrorKind::Resource,
        }
    }

    pub(crate) fn dimension(what: impl Into<String>, expected: usize, received: usize) -> Self {
        PortError::DimensionMismatch {
            what: what.into(),
            expected,
            received,
        }
    }

    pub(crate) fn invalid_model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        PortError::InvalidModel {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

pub type PortResult<T> = Result<T, PortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_error_names_both_sizes() {
        let err = PortError::dimension("observation", 2, 3);
        let msg = err.to_string();
        assert!(msg.contains("observation"));
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("received 3"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn lifecycle_error_reports_phase() {
        let err = PortError::Lifecycle {
            operation: "step",
            phase: PortPhase::Terminated,
        };
        assert_eq!(err.to_string(), "cannot step: port is terminated");
        assert_eq!(err.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn missing_symbol_is_module_resolution() {
        let err = PortError::MissingSymbol {
            path: PathBuf::from("Output/EstimatorPortN.so"),
            symbol: "StateSpaceModel1_EstimatorPort".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ModuleResolution);
        assert!(err.to_string().contains("StateSpaceModel1_EstimatorPort"));
    }
}
