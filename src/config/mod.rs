//! # Dispatcher Configuration
//!
//! Layered configuration for the dispatcher, the in-process engine and logging.
//!
//! ## Layering
//!
//! 1. Built-in defaults
//! 2. `dispatcher.toml` in the configuration directory (optional)
//! 3. `dispatcher.<environment>.toml` (optional)
//! 4. `BATCH_DISPATCH_*` environment variables, nested with `__`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batch_dispatch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let chunk_size = manager.config().dispatch.default_chunk_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `dispatcher.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Chunking defaults for the dispatch core
    pub dispatch: DispatchConfig,

    /// In-process execution engine settings
    pub engine: EngineConfig,

    /// Labels attached to every scheduled batch
    pub batch: BatchMessagesConfig,

    /// Structured logging settings
    pub logging: LoggingConfig,
}

impl DispatcherConfig {
    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dispatch.default_chunk_size < 1 {
            return Err(ConfigurationError::invalid_value(
                "dispatch.default_chunk_size",
                self.dispatch.default_chunk_size,
                "chunk size must be at least 1",
            ));
        }
        if self.engine.items_per_cycle == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.items_per_cycle",
                self.engine.items_per_cycle,
                "a cycle must process at least one item",
            ));
        }
        if self.engine.max_concurrent_items == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.max_concurrent_items",
                self.engine.max_concurrent_items,
                "concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Chunk size used when a batch descriptor does not declare one
    pub default_chunk_size: i64,

    /// Treat a descriptor without a chunk size as a configuration error
    pub require_explicit_chunk_size: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: constants::DEFAULT_CHUNK_SIZE,
            require_explicit_chunk_size: false,
        }
    }
}

/// What the in-process engine does after a work item fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and keep running the remaining items
    #[default]
    ContinueOnFailure,
    /// Report the failure and skip the rest of the batch
    AbortBatch,
}

/// Order in which the in-process engine picks pending work items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOrder {
    #[default]
    Registration,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Work items executed per progressive cycle
    pub items_per_cycle: usize,
    /// Upper bound on simultaneously running items in concurrent mode
    pub max_concurrent_items: usize,
    pub failure_policy: FailurePolicy,
    pub execution_order: ExecutionOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            items_per_cycle: 1,
            max_concurrent_items: 4,
            failure_policy: FailurePolicy::default(),
            execution_order: ExecutionOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchMessagesConfig {
    pub title: String,
    pub init_message: String,
    pub progress_message: String,
    pub error_message: String,
}

impl Default for BatchMessagesConfig {
    fn default() -> Self {
        Self {
            title: constants::batch_messages::TITLE.to_string(),
            init_message: constants::batch_messages::INIT.to_string(),
            progress_message: constants::batch_messages::PROGRESS.to_string(),
            error_message: constants::batch_messages::ERROR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; falls back to an environment-derived level
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DispatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatch.default_chunk_size, 50);
        assert_eq!(config.engine.failure_policy, FailurePolicy::ContinueOnFailure);
        assert_eq!(config.batch.title, "Processing Batch");
    }

    #[test]
    fn test_validate_rejects_non_positive_chunk_size() {
        let mut config = DispatcherConfig::default();
        config.dispatch.default_chunk_size = 0;

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("dispatch.default_chunk_size"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = DispatcherConfig::default();
        config.engine.max_concurrent_items = 0;
        assert!(config.validate().is_err());

        let mut config = DispatcherConfig::default();
        config.engine.items_per_cycle = 0;
        assert!(config.validate().is_err());
    }
}
