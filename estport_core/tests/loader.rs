// estport_core/tests/loader.rs

use estport_core::error::{ErrorKind, PortError};
use estport_core::loader::{module_file_name, LoadedModule};

#[test]
fn nonexistent_module_path_fails_to_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(module_file_name("estport_module"));
    let err = LoadedModule::open(&path, "StateSpaceModel1").unwrap_err();
    match &err {
        PortError::ModuleNotFound { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::ModuleResolution);
    assert!(err.to_string().contains("estport_module"));
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn library_without_lifecycle_symbols_is_rejected() {
    let err = LoadedModule::open("libc.so.6", "StateSpaceModel1").unwrap_err();
    match err {
        PortError::MissingSymbol { symbol, .. } => {
            assert_eq!(symbol, "StateSpaceModel1_Initialization");
        }
        other => panic!("unexpected error: {other}"),
    }
}
