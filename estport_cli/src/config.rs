// estport_cli/src/config.rs

use std::path::Path;

use anyhow::{Context, Result};
use estport_core::config::RunConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use tracing::info;

/// Environment overrides look like `ESTPORT_PORT__BACKEND=dynamic`.
pub const ENV_PREFIX: &str = "ESTPORT_";

/// Loads the run configuration: built-in defaults, then the TOML file (if it
/// exists), then `ESTPORT_` environment variables.
pub fn load(path: &Path) -> Result<RunConfig> {
    let config: RunConfig = figment(path)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    info!(
        config = %path.display(),
        model = config.model_name(),
        backend = %config.port.backend,
        "Configuration loaded"
    );
    Ok(config)
}

fn figment(path: &Path) -> Figment {
    Figment::new().merge(Toml::file(path))
}

/// The configuration rendered back as TOML.
pub fn render(config: &RunConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use estport_core::config::Backend;
    use estport_core::port::PortVariant;
    use std::fs;
    use std::path::PathBuf;

    fn from_file(text: &str) -> Result<RunConfig> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estport.toml");
        fs::write(&path, text).unwrap();
        figment(&path).extract().map_err(Into::into)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config: RunConfig = figment(Path::new("no/such/estport.toml")).extract().unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = from_file(
            r#"
            [input]
            path = "data/trace.txt"
            expected_rows = 1000
            columns = { time_column = 0, observation_start = 1, observation_len = 2 }

            [output]
            directory = "out"
            precision = 9

            [port]
            model = "StateSpaceModel1"
            variant = "value-only"
            backend = "dynamic"
            module_path = "Output/libestport_module.so"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.path, PathBuf::from("data/trace.txt"));
        assert_eq!(config.input.expected_rows, Some(1000));
        assert_eq!(config.input.columns.observation_len, Some(2));
        assert_eq!(config.output.precision, 9);
        assert_eq!(config.port.variant, Some(PortVariant::ValueOnly));
        assert_eq!(config.port.backend, Backend::Dynamic);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(from_file("[output]\ndirectory = \"out\"\ncolour = \"red\"\n").is_err());
    }

    #[test]
    fn rendered_config_parses_back() {
        let config = RunConfig::default();
        let text = render(&config).unwrap();
        assert_eq!(from_file(&text).unwrap(), config);
    }
}
