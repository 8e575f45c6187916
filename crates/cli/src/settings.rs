//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults.
//! 2. The TOML file given by `--config` (optional; missing files are skipped).
//! 3. Environment variables prefixed `DEVOPS_SYNC__`, with `__` between
//!    path segments, e.g. `DEVOPS_SYNC__WORKFLOW__PROJECT_URL`.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use workflow::WorkflowOptions;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "devops-sync.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DEVOPS_SYNC";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub workflow: WorkflowOptions,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// JSON log lines instead of human-readable output.
    pub json: bool,
    /// OTLP gRPC collector endpoint. Span export is off when unset.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json: false,
            otlp_endpoint: None,
            service_name: "devops-sync".into(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: &Path, environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                environment
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("workflow.configuration_file_paths"),
            )
            .build()?
            .try_deserialize()
    }
}
