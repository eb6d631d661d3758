// estport_cli/src/commands/inspect.rs

use anyhow::Result;
use estport_core::config::{Backend, RunConfig};
use estport_core::loader::LoadedModule;
use estport_core::port::{EstimatorPort, PortSnapshot};

pub fn run(config: &RunConfig) -> Result<()> {
    match config.port.backend {
        Backend::Native => {
            let mut port = config.native_port()?;
            let mut descriptor = port.new_descriptor();
            port.initialize(&mut descriptor)?;
            let snapshot = descriptor.snapshot()?;
            port.terminate(&mut descriptor)?;
            print!("{}", describe(&snapshot));
        }
        Backend::Dynamic => {
            let module = LoadedModule::open(&config.port.module_path, config.model_name())?;
            let mut port = module.port(config.dynamic_variant());
            let mut raw = port.new_descriptor();
            port.initialize(&mut raw)?;
            let dims = port.dimensions(&raw)?;
            port.terminate(&mut raw)?;
            println!("module       {}", module.path().display());
            println!("model        {}", module.model());
            println!("variant      {}", port.variant());
            println!("Nx / Nz      {} / {}", dims.nx, dims.nz);
        }
    }
    Ok(())
}

/// A readable dump of a freshly initialized descriptor.
pub fn describe(snapshot: &PortSnapshot) -> String {
    let config = &snapshot.config;
    let m = &snapshot.matrices;
    let mut out = String::new();
    out.push_str(&format!("PortName          {}\n", snapshot.name));
    out.push_str(&format!("PortIntroduction  {}\n", snapshot.introduction));
    out.push_str(&format!("Nx / Nz           {} / {}\n", config.nx, config.nz));
    out.push_str(&format!("PredictStep       {}\n", config.predict_step));
    out.push_str(&format!("Intervel          {}\n", config.interval));
    out.push_str(&format!("PredictTime       {}\n", config.predict_time));
    out.push_str(&format!("EstimatedState    {:?}\n", snapshot.estimated_state.as_slice()));
    out.push_str(&format!("Int_Par           {:?}\n", snapshot.int_par));
    out.push_str(&format!("Double_Par        {:?}\n", snapshot.double_par));
    for (name, matrix) in [
        ("F", &m.f),
        ("G", &m.g),
        ("B", &m.b),
        ("H", &m.h),
        ("P", &m.p),
        ("Q", &m.q),
        ("R", &m.r),
    ] {
        out.push_str(&format!("Matrix_{name}{matrix}"));
    }
    out
}
