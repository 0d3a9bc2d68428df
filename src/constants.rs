//! # System Constants
//!
//! Core constants and small enums that define the operational boundaries of
//! the dispatcher and its in-process engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk size used when a batch descriptor omits one and configuration does
/// not override it.
pub const DEFAULT_CHUNK_SIZE: i64 = 50;

/// Logger channel name used for every dispatcher event
pub const LOG_CHANNEL: &str = "batch_dispatch";

/// Structured event names emitted through the dispatch logger
pub mod events {
    pub const DISPATCH_CHECKED: &str = "dispatch.checked";
    pub const DISPATCH_DIRECT: &str = "dispatch.direct";
    pub const DISPATCH_BATCHING_ENABLED: &str = "dispatch.batching_enabled";
    pub const DISPATCH_BATCH_SCHEDULED: &str = "dispatch.batch_scheduled";

    pub const WORK_ITEM_STARTED: &str = "work_item.started";
    pub const WORK_ITEM_COMPLETED: &str = "work_item.completed";

    pub const METHOD_INVOKED: &str = "method.invoked";
    pub const METHOD_RETURNED: &str = "method.returned";
}

/// Default labels for a scheduled batch
pub mod batch_messages {
    pub const TITLE: &str = "Processing Batch";
    pub const INIT: &str = "Initializing batch process...";
    pub const PROGRESS: &str = "Processing batch...";
    pub const ERROR: &str = "Batch processing encountered an error.";
}

pub mod env_vars {
    /// Prefix for configuration overrides (`BATCH_DISPATCH_DISPATCH__DEFAULT_CHUNK_SIZE`)
    pub const PREFIX: &str = "BATCH_DISPATCH";
    pub const ENVIRONMENT: &str = "BATCH_DISPATCH_ENV";
    pub const APP_ENVIRONMENT: &str = "APP_ENV";
}

pub mod config_files {
    pub const DEFAULT_DIRECTORY: &str = "config";
    pub const FILE_STEM: &str = "dispatcher";
    pub const BASE_FILE: &str = "dispatcher.toml";
}

/// Lifecycle state of a work item inside an execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl WorkItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!WorkItemStatus::Pending.is_terminal());
        assert!(!WorkItemStatus::Running.is_terminal());
        assert!(WorkItemStatus::Succeeded.is_terminal());
        assert!(WorkItemStatus::Failed.is_terminal());
        assert!(WorkItemStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkItemStatus::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
        assert_eq!(WorkItemStatus::Skipped.to_string(), "skipped");
    }
}
