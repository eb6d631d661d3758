// estport_core/src/loader/export.rs

//! The module side of the ABI: wraps a [`NativePort`] behind the raw
//! lifecycle symbols. Use [`export_estimator_port!`](crate::export_estimator_port)
//! rather than calling these directly.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::{ptr, slice};

use tracing::error;

use super::abi::{PortStatus, RawPort, PORT_ABI_VERSION};
use crate::error::PortError;
use crate::models::ModelBinding;
use crate::port::{EstimatorPort, NativePort, PortDescriptor, PortPhase, PortVariant};

/// What `RawPort::instance` points at while the handle is Ready.
struct Instance {
    port: NativePort,
    descriptor: PortDescriptor,
}

fn fault(err: PortError) -> PortStatus {
    error!(error = %err, "estimator module call failed");
    PortStatus::from_error(&err)
}

/// Runs `body` so that neither an error nor a panic crosses the C boundary.
fn guard(body: impl FnOnce() -> Result<(), PortStatus>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => PortStatus::Ok as i32,
        Ok(Err(status)) => status as i32,
        Err(_) => {
            error!("estimator module panicked; the port handle is left as it was");
            PortStatus::Panicked as i32
        }
    }
}

/// Body of `<Model>_Initialization`.
///
/// # Safety
///
/// `raw` must be null or point to a valid, exclusively accessible [`RawPort`].
pub unsafe fn initialize(
    raw: *mut RawPort,
    binding: impl FnOnce() -> Box<dyn ModelBinding>,
) -> i32 {
    guard(|| {
        let raw = unsafe { raw.as_mut() }.ok_or(PortStatus::NullPointer)?;
        if raw.phase() != PortPhase::Uninitialized || !raw.instance.is_null() {
            return Err(PortStatus::Lifecycle);
        }
        if raw.abi_version != PORT_ABI_VERSION {
            return Err(PortStatus::Configuration);
        }
        let variant = PortVariant::from_raw(raw.variant).ok_or(PortStatus::Configuration)?;

        let mut port = NativePort::new(binding()).with_variant(variant);
        let mut descriptor = port.new_descriptor();
        port.initialize(&mut descriptor).map_err(fault)?;
        let dims = descriptor.dimensions().map_err(fault)?;

        raw.nx = dims.nx as u32;
        raw.nz = dims.nz as u32;
        raw.timestamp = 0.0;
        raw.instance = Box::into_raw(Box::new(Instance { port, descriptor })).cast::<c_void>();
        raw.phase = PortPhase::Ready as u32;
        Ok(())
    })
}

/// Body of `<Model>_EstimatorPort`.
///
/// # Safety
///
/// `raw` must be null or point to a valid [`RawPort`]; `observation` and
/// `state_out` must be null or valid for `observation_len` and `state_len`
/// elements respectively.
pub unsafe fn step(
    observation: *const f64,
    observation_len: usize,
    timestamp: f64,
    state_out: *mut f64,
    state_len: usize,
    raw: *mut RawPort,
) -> i32 {
    guard(|| {
        let raw = unsafe { raw.as_mut() }.ok_or(PortStatus::NullPointer)?;
        if raw.phase() != PortPhase::Ready {
            return Err(PortStatus::Lifecycle);
        }
        let instance = unsafe { raw.instance.cast::<Instance>().as_mut() }
            .ok_or(PortStatus::Lifecycle)?;
        if observation.is_null() || state_out.is_null() {
            return Err(PortStatus::NullPointer);
        }
        if state_len != raw.nx as usize {
            return Err(PortStatus::Dimension);
        }

        let observation = unsafe { slice::from_raw_parts(observation, observation_len) };
        let state = instance
            .port
            .step(&mut instance.descriptor, observation, timestamp)
            .map_err(fault)?;
        let state_out = unsafe { slice::from_raw_parts_mut(state_out, state_len) };
        state_out.copy_from_slice(state.as_slice());
        raw.timestamp = instance
            .descriptor
            .buffers("step")
            .map_err(fault)?
            .current_timestamp;
        Ok(())
    })
}

/// Body of `<Model>_EstimatorPortTermination`.
///
/// # Safety
///
/// `raw` must be null or point to a valid, exclusively accessible [`RawPort`].
pub unsafe fn terminate(raw: *mut RawPort) -> i32 {
    guard(|| {
        let raw = unsafe { raw.as_mut() }.ok_or(PortStatus::NullPointer)?;
        if raw.phase() != PortPhase::Ready || raw.instance.is_null() {
            return Err(PortStatus::Lifecycle);
        }
        let mut instance = unsafe { Box::from_raw(raw.instance.cast::<Instance>()) };
        raw.instance = ptr::null_mut();
        raw.phase = PortPhase::Terminated as u32;

        let Instance { port, descriptor } = &mut *instance;
        port.terminate(descriptor).map_err(fault)
    })
}

/// Exports the three lifecycle symbols (plus the ABI version query) of one
/// model binding from a `cdylib`.
///
/// Each generated function is checked against the signature declared in
/// [`crate::loader::abi`], so exporter and loader cannot drift apart.
///
/// ```ignore
/// estport_core::export_estimator_port! {
///     binding: ConstantVelocity2d::value_only(),
///     initialization: StateSpaceModel1_Initialization,
///     estimator_port: StateSpaceModel1_EstimatorPort,
///     termination: StateSpaceModel1_EstimatorPortTermination,
///     abi_version: StateSpaceModel1_PortAbiVersion,
/// }
/// ```
#[macro_export]
macro_rules! export_estimator_port {
    (
        binding: $binding:expr,
        initialization: $init:ident,
        estimator_port: $step:ident,
        termination: $term:ident,
        abi_version: $version:ident $(,)?
    ) => {
        /// # Safety
        ///
        /// `port` must be null or point to a valid, exclusively accessible `RawPort`.
        #[no_mangle]
        pub unsafe extern "C" fn $init(port: *mut $crate::loader::abi::RawPort) -> i32 {
            unsafe { $crate::loader::export::initialize(port, || ::std::boxed::Box::new($binding)) }
        }

        /// # Safety
        ///
        /// Pointers must be null or valid for the lengths passed alongside them.
        #[no_mangle]
        pub unsafe extern "C" fn $step(
            observation: *const f64,
            observation_len: usize,
            timestamp: f64,
            state_out: *mut f64,
            state_len: usize,
            port: *mut $crate::loader::abi::RawPort,
        ) -> i32 {
            unsafe {
                $crate::loader::export::step(
                    observation,
                    observation_len,
                    timestamp,
                    state_out,
                    state_len,
                    port,
                )
            }
        }

        /// # Safety
        ///
        /// `port` must be null or point to a valid, exclusively accessible `RawPort`.
        #[no_mangle]
        pub unsafe extern "C" fn $term(port: *mut $crate::loader::abi::RawPort) -> i32 {
            unsafe { $crate::loader::export::terminate(port) }
        }

        #[no_mangle]
        pub extern "C" fn $version() -> u32 {
            $crate::loader::abi::PORT_ABI_VERSION
        }

        const _: $crate::loader::abi::InitializationFn = $init;
        const _: $crate::loader::abi::EstimatorPortFn = $step;
        const _: $crate::loader::abi::TerminationFn = $term;
        const _: $crate::loader::abi::AbiVersionFn = $version;
    };
}
