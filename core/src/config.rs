//! Runtime configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `catflow.toml` in the working directory, if present
//! 3. an explicit config file (`--config`)
//! 4. `CATFLOW_*` environment variables (`.env` is loaded by the CLI first)
//!
//! Command-line flags are applied on top by the CLI.

use std::path::Path;
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interpreter::ProductPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "catflow.toml";
pub const ENV_PREFIX: &str = "CATFLOW";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Abort a typed run on the first runtime type violation
    pub strict: bool,
    /// Run through the typed interpreter
    pub typed: bool,
    pub product_policy: ProductPolicy,
    /// Deadline for each leaf task, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout_ms: Option<u64>,
    /// Artificial latency of the simulated executor, in milliseconds
    pub simulated_latency_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            typed: true,
            product_policy: ProductPolicy::FailFast,
            task_timeout_ms: None,
            simulated_latency_ms: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from the default locations and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load with an additional explicit config file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn build(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let loaded: Config = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "task_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level '{}' (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    /// Effective configuration as a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
