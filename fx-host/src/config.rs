//! Host configuration

use fx_step::{EngineConfig, EngineConfigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration of an analysis session, read from TOML:
///
/// ```toml
/// verbose = true
/// fail_fast = false
///
/// [engine]
/// record_trace = true
/// trace_capacity = 256
///
/// [options]
/// strict = "true"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Log at debug level
    #[serde(default)]
    pub verbose: bool,

    /// Stop at the first file whose check hits a defect
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Free-form settings handed to checks as the `host_options` capability
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl HostConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })?;

        let config: HostConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize { error: e })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                error: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if let Some(name) = self.options.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "options".to_string(),
                message: format!("Option names must not be blank, found {name:?}"),
            });
        }

        Ok(())
    }

    /// Merge with an overriding configuration. Options from `other` replace
    /// options of the same name; `verbose` and `fail_fast` are only ever
    /// switched on, never back off.
    pub fn merge(&mut self, other: HostConfig) {
        self.engine.merge(other.engine);
        if other.verbose {
            self.verbose = true;
        }
        if other.fail_fast {
            self.fail_fast = true;
        }
        self.options.extend(other.options);
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Parse error for {path:?}: {error}")]
    Parse { path: PathBuf, error: toml::de::Error },

    #[error("Serialization error: {error}")]
    Serialize { error: toml::ser::Error },

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error(transparent)]
    Engine(#[from] EngineConfigError),
}
