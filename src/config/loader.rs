//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery, environment
//! detection and layering of TOML files with environment variable overrides.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::DispatcherConfig;
use crate::constants::{config_files, env_vars};

/// Loaded configuration together with where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: DispatcherConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Load configuration, reading overrides from `env_overrides` instead of the
    /// process environment when given. Useful for tests that must not touch
    /// global environment variables.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory =
            config_dir.unwrap_or_else(|| PathBuf::from(config_files::DEFAULT_DIRECTORY));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment, env_overrides)?;
        config.validate()?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            default_chunk_size = config.dispatch.default_chunk_size,
            failure_policy = ?config.engine.failure_policy,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration.
    pub fn from_config(
        config: DispatcherConfig,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from(config_files::DEFAULT_DIRECTORY),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var(env_vars::ENVIRONMENT)
            .or_else(|_| env::var(env_vars::APP_ENVIRONMENT))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        env_overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<DispatcherConfig> {
        let base_path = config_directory.join(config_files::BASE_FILE);
        let env_path =
            config_directory.join(format!("{}.{environment}.toml", config_files::FILE_STEM));

        let mut environment_source = Environment::with_prefix(env_vars::PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        if let Some(overrides) = env_overrides {
            environment_source = environment_source.source(Some(overrides.into_iter().collect()));
        }

        let merged = Config::builder()
            .add_source(File::new(&base_path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(File::new(&env_path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(environment_source)
            .build()
            .map_err(|e| {
                ConfigurationError::load_error(config_directory.display().to_string(), e)
            })?;

        merged
            .try_deserialize::<DispatcherConfig>()
            .map_err(ConfigurationError::deserialization_error)
    }
}
