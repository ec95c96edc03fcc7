use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub mod app;
pub mod limits;
pub mod validation;

pub use app::{AppConfig, HttpConfig, MarketplaceConfig};
pub use validation::{ConfigLoadResult, ConfigValidationError};

use crate::error::{AppError, AppResult};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "theme-porter.toml";

/// Prefix of environment overrides, e.g. `THEME_PORTER__HTTP__TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "THEME_PORTER";

/// Global configuration loading and access
static CONFIG: std::sync::OnceLock<ConfigLoadResult> = std::sync::OnceLock::new();

fn environment(vars: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

/// Loads configuration from `path` (or the optional default file) and the
/// environment.
///
/// `env_vars` replaces the process environment when given.
pub fn load_config_from(
    path: Option<&Path>,
    env_vars: Option<HashMap<String, String>>,
) -> ConfigLoadResult {
    let file_source = match path {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE)
            .format(FileFormat::Toml)
            .required(false),
    };

    let config = match Config::builder()
        .add_source(file_source)
        .add_source(environment(env_vars)) // environment entries override file values
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            return ConfigLoadResult::LoadError(format!(
                "Configuration loading failed: {e}. Please check your theme-porter.toml file and environment variables."
            ));
        }
    };

    match config.try_deserialize::<AppConfig>() {
        Ok(app_config) => {
            if let Err(validation_errors) = app_config.validate() {
                let error_messages: Vec<String> =
                    validation_errors.iter().map(|e| e.user_message()).collect();
                return ConfigLoadResult::DeserializeError(format!(
                    "Configuration validation failed:\n{}",
                    error_messages.join("\n\n")
                ));
            }
            ConfigLoadResult::Success(Box::new(app_config))
        }
        Err(e) => ConfigLoadResult::DeserializeError(format!("Failed to deserialize config: {e}")),
    }
}

fn load_config(path: Option<&Path>) -> ConfigLoadResult {
    dotenv::dotenv().ok();
    load_config_from(path, None)
}

/// Loads the process-wide configuration on first use.
///
/// Later calls return the first result whatever `path` they pass.
pub fn init_config(path: Option<&Path>) -> AppResult<&'static AppConfig> {
    match CONFIG.get_or_init(|| load_config(path)) {
        ConfigLoadResult::Success(config) => Ok(config),
        ConfigLoadResult::LoadError(e) => Err(AppError::Config(e.clone())),
        ConfigLoadResult::DeserializeError(e) => Err(AppError::Config(e.clone())),
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}
