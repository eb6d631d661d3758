// estport_core/src/loader/abi.rs

//! The C ABI between a host and a runtime-loaded estimator module.
//!
//! Every type that crosses the boundary is declared here, once. The host
//! resolves symbols into [`LifecycleSymbols`], whose fields carry these exact
//! function-pointer types, and the exporting side is generated by
//! [`export_estimator_port!`](crate::export_estimator_port), which checks its
//! functions against the same types at compile time.

use std::ffi::c_void;
use std::ptr;

use tracing::warn;

use crate::error::{ErrorKind, PortError};
use crate::port::{PortPhase, PortVariant};

/// Bumped whenever anything in this file changes shape.
pub const PORT_ABI_VERSION: u32 = 2;

/// The caller-allocated descriptor handle that crosses the module boundary.
///
/// The header fields are readable by the host; `instance` points at the
/// module-owned descriptor and is opaque. The host sets `variant` before
/// Initialize; the module fills everything else. `timestamp` is the
/// descriptor clock after the last accepted Step.
#[repr(C)]
#[derive(Debug)]
pub struct RawPort {
    pub abi_version: u32,
    pub variant: u32,
    pub phase: u32,
    pub nx: u32,
    pub nz: u32,
    pub timestamp: f64,
    pub instance: *mut c_void,
}

impl RawPort {
    pub fn new(variant: PortVariant) -> Self {
        Self {
            abi_version: PORT_ABI_VERSION,
            variant: variant.as_raw(),
            phase: PortPhase::Uninitialized as u32,
            nx: 0,
            nz: 0,
            timestamp: 0.0,
            instance: ptr::null_mut(),
        }
    }

    /// The lifecycle phase recorded in the header. An unknown value is
    /// treated as `Terminated` so that nothing further is attempted.
    pub fn phase(&self) -> PortPhase {
        PortPhase::from_raw(self.phase).unwrap_or(PortPhase::Terminated)
    }
}

impl Drop for RawPort {
    fn drop(&mut self) {
        if !self.instance.is_null() {
            warn!(
                nx = self.nx,
                nz = self.nz,
                "RawPort dropped while still initialized; module-owned buffers were not released"
            );
        }
    }
}

/// Status codes returned by every lifecycle symbol.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Ok = 0,
    NullPointer = -1,
    Lifecycle = -2,
    Dimension = -3,
    Resource = -4,
    Configuration = -5,
    Panicked = -6,
    /// A Step timestamp ran backwards; `RawPort::timestamp` holds the previous one.
    Timestamp = -7,
}

impl PortStatus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(PortStatus::Ok),
            -1 => Some(PortStatus::NullPointer),
            -2 => Some(PortStatus::Lifecycle),
            -3 => Some(PortStatus::Dimension),
            -4 => Some(PortStatus::Resource),
            -5 => Some(PortStatus::Configuration),
            -6 => Some(PortStatus::Panicked),
            -7 => Some(PortStatus::Timestamp),
            _ => None,
        }
    }

    pub fn from_error(err: &PortError) -> Self {
        match (err.kind(), err) {
            (_, PortError::DimensionMismatch { .. }) => PortStatus::Dimension,
            (_, PortError::NonMonotonicTimestamp { .. }) => PortStatus::Timestamp,
            (ErrorKind::Lifecycle, _) => PortStatus::Lifecycle,
            (ErrorKind::Resource, _) => PortStatus::Resource,
            _ => PortStatus::Configuration,
        }
    }
}

// --- Lifecycle signatures ---

/// `<Model>_Initialization`
pub type InitializationFn = unsafe extern "C" fn(port: *mut RawPort) -> i32;

/// `<Model>_EstimatorPort`: one Step, always timestamped, always writing the
/// `Nx`-length state into `state_out`.
pub type EstimatorPortFn = unsafe extern "C" fn(
    observation: *const f64,
    observation_len: usize,
    timestamp: f64,
    state_out: *mut f64,
    state_len: usize,
    port: *mut RawPort,
) -> i32;

/// `<Model>_EstimatorPortTermination`
pub type TerminationFn = unsafe extern "C" fn(port: *mut RawPort) -> i32;

/// `<Model>_PortAbiVersion` (optional): reports [`PORT_ABI_VERSION`] of the exporter.
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// The exported symbol names for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNames {
    pub initialization: String,
    pub estimator_port: String,
    pub termination: String,
    pub abi_version: String,
}

impl SymbolNames {
    pub fn for_model(model: &str) -> Self {
        Self {
            initialization: format!("{model}_Initialization"),
            estimator_port: format!("{model}_EstimatorPort"),
            termination: format!("{model}_EstimatorPortTermination"),
            abi_version: format!("{model}_PortAbiVersion"),
        }
    }
}

/// The three resolved lifecycle entry points of one model.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSymbols {
    pub initialization: InitializationFn,
    pub estimator_port: EstimatorPortFn,
    pub termination: TerminationFn,
}
