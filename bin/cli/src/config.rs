//! Centralized CLI configuration.
//!
//! Loaded via the `config` crate from an optional TOML file and environment
//! variables prefixed with `SWITCHYARD_`, using `__` between nested keys
//! (`SWITCHYARD_ENGINE__POLL_INTERVAL_MS=500`). Environment values win.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use switchyard_workflow::{EngineConfig, HistoryConfig};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SWITCHYARD";

/// CLI configuration composed from library configs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Run engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Editor settings.
    #[serde(default)]
    pub editor: HistoryConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Workflow store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Where stored workflows live.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("workflows")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from an optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or any value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert_eq!(config.engine.poll_interval_ms, 2000);
        assert_eq!(config.engine.poll_max_attempts, 30);
        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.store.dir, PathBuf::from("workflows"));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[engine]\npoll_interval_ms = 250\n\n[editor]\nhistory_limit = 0\n\n[log]\nfilter = \"debug\""
        )
        .expect("write");

        let config = CliConfig::load(Some(file.path())).expect("load");

        assert_eq!(config.engine.poll_interval_ms, 250);
        assert_eq!(config.engine.poll_max_attempts, 30);
        assert_eq!(config.editor.history_limit, 0);
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
