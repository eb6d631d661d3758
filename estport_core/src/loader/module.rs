// estport_core/src/loader/module.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{info, warn};

use super::abi::{
    AbiVersionFn, EstimatorPortFn, InitializationFn, LifecycleSymbols, SymbolNames, TerminationFn,
    PORT_ABI_VERSION,
};
use super::dynamic_port::DynamicPort;
use crate::error::{PortError, PortResult};
use crate::port::PortVariant;

/// Platform file name of a module built from the crate `stem`,
/// e.g. `libestport_module.so` or `estport_module.dll`.
pub fn module_file_name(stem: &str) -> OsString {
    libloading::library_filename(stem)
}

/// An opened module with the three lifecycle symbols of one model resolved.
///
/// Ports created from it borrow it, so the library cannot be unloaded while
/// any of its function pointers are still reachable.
#[derive(Debug)]
pub struct LoadedModule {
    path: PathBuf,
    model: String,
    symbols: LifecycleSymbols,
    // Must outlive `symbols`.
    library: Library,
}

impl LoadedModule {
    /// Opens the module at `path` and resolves the symbols exported for `model`.
    pub fn open(path: impl AsRef<Path>, model: &str) -> PortResult<Self> {
        let path = path.as_ref();
        // SAFETY: opening a module runs its initialisers. Modules are build
        // outputs of this workspace or equivalent trusted code.
        let library = unsafe { Library::new(path) }.map_err(|err| PortError::ModuleNotFound {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let names = SymbolNames::for_model(model);
        // SAFETY: the symbol types come from `abi`, the same declarations the
        // exporting side is checked against.
        let symbols = unsafe { resolve(&library, path, &names)? };

        info!(
            module = %path.display(),
            model,
            "Resolved {}, {} and {}",
            names.initialization,
            names.estimator_port,
            names.termination
        );
        Ok(Self {
            path: path.to_path_buf(),
            model: model.to_string(),
            symbols,
            library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn symbols(&self) -> &LifecycleSymbols {
        &self.symbols
    }

    /// A port driving this module's symbols.
    pub fn port(&self, variant: PortVariant) -> DynamicPort<'_> {
        // SAFETY: the symbols stay valid for as long as `self.library` is
        // loaded, and the returned port borrows `self`.
        unsafe { DynamicPort::from_symbols(&self.model, &self.symbols, variant) }
    }

    /// Unloads the library.
    pub fn close(self) -> PortResult<()> {
        let LoadedModule { path, library, .. } = self;
        library.close().map_err(|err| PortError::ModuleNotFound {
            path,
            reason: err.to_string(),
        })
    }
}

unsafe fn symbol<T: Copy>(library: &Library, path: &Path, name: &str) -> PortResult<T> {
    let found: Symbol<T> =
        unsafe { library.get(name.as_bytes()) }.map_err(|_| PortError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: name.to_string(),
        })?;
    Ok(*found)
}

unsafe fn resolve(
    library: &Library,
    path: &Path,
    names: &SymbolNames,
) -> PortResult<LifecycleSymbols> {
    let symbols = unsafe {
        LifecycleSymbols {
            initialization: symbol::<InitializationFn>(library, path, &names.initialization)?,
            estimator_port: symbol::<EstimatorPortFn>(library, path, &names.estimator_port)?,
            termination: symbol::<TerminationFn>(library, path, &names.termination)?,
        }
    };

    match unsafe { symbol::<AbiVersionFn>(library, path, &names.abi_version) } {
        Ok(version) => {
            let found = unsafe { version() };
            if found != PORT_ABI_VERSION {
                return Err(PortError::SignatureMismatch {
                    path: path.to_path_buf(),
                    symbol: names.abi_version.clone(),
                    expected: PORT_ABI_VERSION,
                    found,
                });
            }
        }
        Err(_) => warn!(
            module = %path.display(),
            "{} is not exported; lifecycle signatures cannot be verified",
            names.abi_version
        ),
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn missing_module_is_a_resolution_error() {
        let err =
            LoadedModule::open("does/not/exist/libnothing.so", "StateSpaceModel1").unwrap_err();
        assert!(matches!(err, PortError::ModuleNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::ModuleResolution);
    }

    #[test]
    fn module_file_name_is_platform_specific() {
        let name = module_file_name("estport_module");
        let name = name.to_string_lossy();
        assert!(name.contains("estport_module"));
        #[cfg(target_os = "linux")]
        assert_eq!(name, "libestport_module.so");
        #[cfg(target_os = "windows")]
        assert_eq!(name, "estport_module.dll");
    }
}
