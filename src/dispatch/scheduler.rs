//! Registers one work item per chunk with the execution engine.

use std::sync::Arc;

use serde_json::Value;

use super::chunk::Chunk;
use super::context::ExecutionContext;
use super::runner::WorkItemRunner;
use super::work_item::{BatchId, WorkItem};
use crate::config::BatchMessagesConfig;
use crate::engine::{BatchBuilder, ExecutionEngine};
use crate::error::{DispatcherResult, EngineError};
use crate::logging::{DispatchEvent, DispatchLogger};
use crate::registry::DispatchTarget;

/// Caller-side view of a scheduled batch.
///
/// Holds the shared [`ExecutionContext`], so results can be read as the engine
/// completes work items.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    pub batch_id: BatchId,
    pub method: String,
    pub chunk_size: usize,
    pub item_count: usize,
    pub chunk_count: usize,
    context: Arc<ExecutionContext>,
}

impl BatchHandle {
    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    pub fn is_complete(&self) -> bool {
        self.context.is_complete()
    }

    pub fn completed_chunks(&self) -> usize {
        self.context.completed_count()
    }
}

pub struct ChunkScheduler {
    engine: Arc<dyn ExecutionEngine>,
    runner: Arc<WorkItemRunner>,
    messages: BatchMessagesConfig,
    logger: Arc<dyn DispatchLogger>,
}

impl ChunkScheduler {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        runner: Arc<WorkItemRunner>,
        messages: BatchMessagesConfig,
        logger: Arc<dyn DispatchLogger>,
    ) -> Self {
        Self {
            engine,
            runner,
            messages,
            logger,
        }
    }

    /// Bind every chunk to `(service, method)` and register the lot with the
    /// engine in chunk order. Returns as soon as registration is accepted.
    ///
    /// No chunks means nothing is registered.
    pub fn schedule(
        &self,
        service: Arc<dyn DispatchTarget>,
        method: &str,
        chunks: Vec<Chunk>,
        extra_args: Vec<Value>,
        chunk_size: usize,
        item_count: usize,
    ) -> DispatcherResult<BatchHandle> {
        let batch_id = BatchId::new();
        let chunk_count = chunks.len();
        let context = Arc::new(ExecutionContext::new(batch_id, method, chunk_count));

        if chunk_count > 0 {
            let extra_args = Arc::new(extra_args);
            let mut builder = BatchBuilder::with_messages(batch_id, &self.messages);
            for chunk in chunks {
                builder.add_operation(WorkItem::new(
                    batch_id,
                    Arc::clone(&service),
                    method,
                    chunk,
                    Arc::clone(&extra_args),
                    Arc::clone(&self.runner),
                    Arc::clone(&context),
                ));
            }

            let accepted = self.engine.register_batch(builder.build())?;
            if accepted != batch_id {
                return Err(EngineError::RegistrationRejected(format!(
                    "engine acknowledged batch {accepted} instead of {batch_id}"
                ))
                .into());
            }
        }

        self.logger.log(DispatchEvent::BatchScheduled {
            service: service.service_name().to_string(),
            method: method.to_string(),
            batch_id,
            chunk_size,
            item_count,
            chunk_count,
        });

        Ok(BatchHandle {
            batch_id,
            method: method.to_string(),
            chunk_size,
            item_count,
            chunk_count,
            context,
        })
    }
}
