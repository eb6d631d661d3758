// estport_core/src/config.rs

//! The run configuration, as read from a `[input]` / `[output]` / `[port]`
//! / `[model]` TOML document.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PortResult;
use crate::harness::ColumnMapping;
use crate::io::DEFAULT_PRECISION;
use crate::loader::module_file_name;
use crate::models::constant_velocity::TIMESTAMPED_MODEL;
use crate::models::linear::{LinearModel, LinearModelConfig};
use crate::models::{binding_by_name, ModelBinding};
use crate::port::{NativePort, PortVariant};

/// Crate name of the bundled module; its platform file name is derived from it.
pub const MODULE_STEM: &str = "estport_module";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub port: PortSection,
    /// A data-defined model; takes precedence over `port.model`.
    #[serde(default)]
    pub model: Option<LinearModelConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// When set, a table with any other number of rows is rejected.
    #[serde(default)]
    pub expected_rows: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ObservationData/DoubleReflectorTrace/Trace1000.txt"),
            columns: ColumnMapping::default(),
            expected_rows: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("EstimationResult"),
            precision: DEFAULT_PRECISION,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// The estimator runs in-process.
    #[default]
    Native,
    /// The estimator is resolved from a shared library at runtime.
    Dynamic,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => write!(f, "native"),
            Backend::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Backend::Native),
            "dynamic" => Ok(Backend::Dynamic),
            other => Err(format!(
                "unknown backend '{other}' (expected 'native' or 'dynamic')"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PortSection {
    pub model: String,
    /// Overrides the variant the binding declares.
    #[serde(default)]
    pub variant: Option<PortVariant>,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_module_path")]
    pub module_path: PathBuf,
}

fn default_module_path() -> PathBuf {
    PathBuf::from("Output").join(module_file_name(MODULE_STEM))
}

impl Default for PortSection {
    fn default() -> Self {
        Self {
            model: TIMESTAMPED_MODEL.to_string(),
            variant: None,
            backend: Backend::Native,
            module_path: default_module_path(),
        }
    }
}

impl RunConfig {
    /// The binding this configuration names: the `[model]` table when present,
    /// otherwise a reference binding looked up by `port.model`.
    pub fn binding(&self) -> PortResult<Box<dyn ModelBinding>> {
        match &self.model {
            Some(model) => Ok(Box::new(LinearModel::from_config(model)?)),
            None => binding_by_name(&self.port.model),
        }
    }

    /// Name of the model whose symbols a dynamic port resolves.
    pub fn model_name(&self) -> &str {
        self.model
            .as_ref()
            .map_or(self.port.model.as_str(), |model| model.name.as_str())
    }

    pub fn native_port(&self) -> PortResult<NativePort> {
        let port = NativePort::new(self.binding()?);
        Ok(match self.port.variant {
            Some(variant) => port.with_variant(variant),
            None => port,
        })
    }

    /// The variant a dynamic port should request, falling back to the one the
    /// named reference binding declares.
    pub fn dynamic_variant(&self) -> PortVariant {
        self.port.variant.unwrap_or_else(|| {
            self.binding()
                .map(|binding| binding.variant())
                .unwrap_or_default()
        })
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        self.input.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::constant_velocity::VALUE_ONLY_MODEL;
    use crate::port::EstimatorPort;

    #[test]
    fn defaults_point_at_the_reference_layout() {
        let config = RunConfig::default();
        assert_eq!(
            config.input.path,
            PathBuf::from("ObservationData/DoubleReflectorTrace/Trace1000.txt")
        );
        assert_eq!(config.output.directory, PathBuf::from("EstimationResult"));
        assert_eq!(config.output.precision, 6);
        assert_eq!(config.port.backend, Backend::Native);
        assert!(config.port.module_path.starts_with("Output"));
        assert_eq!(config.column_mapping(), ColumnMapping::default());
    }

    #[test]
    fn native_port_uses_binding_variant_unless_overridden() {
        let mut config = RunConfig::default();
        config.port.model = VALUE_ONLY_MODEL.to_string();
        assert_eq!(config.native_port().unwrap().variant(), PortVariant::ValueOnly);
        assert_eq!(config.dynamic_variant(), PortVariant::ValueOnly);

        config.port.variant = Some(PortVariant::Timestamped);
        assert_eq!(config.native_port().unwrap().variant(), PortVariant::Timestamped);
    }

    #[test]
    fn unknown_model_is_reported() {
        let mut config = RunConfig::default();
        config.port.model = "NoSuchModel".to_string();
        assert!(config.native_port().is_err());
        assert_eq!(config.dynamic_variant(), PortVariant::Timestamped);
    }

    #[test]
    fn backend_parses_from_text() {
        assert_eq!("dynamic".parse::<Backend>(), Ok(Backend::Dynamic));
        assert!("remote".parse::<Backend>().is_err());
    }
}
