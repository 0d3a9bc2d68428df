//! # Execution Engine Boundary
//!
//! The dispatcher hands every chunk of a batched call to an execution engine
//! and returns immediately. The engine owns when, where and in which order the
//! work items run, and what happens after one of them fails.
//!
//! ```text
//! ChunkScheduler ── BatchBuilder ── BatchDefinition ──► ExecutionEngine::register_batch
//!                                   (title, messages,      │
//!                                    ordered WorkItems)    ▼
//!                                                   WorkItem::execute() × N
//!                                                   (any order, any thread)
//! ```
//!
//! [`InProcessBatchEngine`] is the engine this crate ships: progressive
//! cycles, a tokio-backed concurrent mode and a failure channel.

pub mod in_process;

use crate::config::BatchMessagesConfig;
use crate::dispatch::work_item::{BatchId, WorkItem};
use crate::error::EngineError;

pub use in_process::{
    BatchProgress, CycleReport, InProcessBatchEngine, RunSummary, WorkItemFailure,
};

/// Accepts batches of work items and eventually runs each registered item
/// exactly once.
pub trait ExecutionEngine: Send + Sync {
    /// Register every operation of `batch`, preserving their order.
    fn register_batch(&self, batch: BatchDefinition) -> Result<BatchId, EngineError>;
}

/// A titled, ordered set of work items
#[derive(Debug)]
pub struct BatchDefinition {
    pub batch_id: BatchId,
    pub title: String,
    pub init_message: String,
    pub progress_message: String,
    pub error_message: String,
    pub operations: Vec<WorkItem>,
}

impl BatchDefinition {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Fluent builder for [`BatchDefinition`]
#[derive(Debug)]
pub struct BatchBuilder {
    definition: BatchDefinition,
}

impl BatchBuilder {
    pub fn new(batch_id: BatchId) -> Self {
        Self::with_messages(batch_id, &BatchMessagesConfig::default())
    }

    pub fn with_messages(batch_id: BatchId, messages: &BatchMessagesConfig) -> Self {
        Self {
            definition: BatchDefinition {
                batch_id,
                title: messages.title.clone(),
                init_message: messages.init_message.clone(),
                progress_message: messages.progress_message.clone(),
                error_message: messages.error_message.clone(),
                operations: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.definition.title = title.into();
        self
    }

    #[must_use]
    pub fn init_message(mut self, message: impl Into<String>) -> Self {
        self.definition.init_message = message.into();
        self
    }

    #[must_use]
    pub fn progress_message(mut self, message: impl Into<String>) -> Self {
        self.definition.progress_message = message.into();
        self
    }

    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.definition.error_message = message.into();
        self
    }

    /// Append one operation; operations run in the engine's own order but are
    /// registered in the order they are added.
    pub fn add_operation(&mut self, item: WorkItem) -> &mut Self {
        self.definition.operations.push(item);
        self
    }

    pub fn build(self) -> BatchDefinition {
        self.definition
    }
}
