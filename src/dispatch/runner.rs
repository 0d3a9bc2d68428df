//! Per-chunk callback invoked by the execution engine.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::chunk::Chunk;
use super::context::{ChunkResult, ExecutionContext};
use crate::error::DispatcherResult;
use crate::logging::{DispatchEvent, DispatchLogger};
use crate::registry::{DispatchTarget, ReflectionAdapter};

/// Runs one chunk against its service and records the return value.
pub struct WorkItemRunner {
    adapter: Arc<ReflectionAdapter>,
    logger: Arc<dyn DispatchLogger>,
}

impl WorkItemRunner {
    pub fn new(adapter: Arc<ReflectionAdapter>, logger: Arc<dyn DispatchLogger>) -> Self {
        Self { adapter, logger }
    }

    /// Invoke `method` with `[chunk items, extra_args...]` and append the result
    /// to `context`.
    ///
    /// A failing invocation is returned to the caller (the engine) untouched and
    /// nothing is appended for that chunk.
    pub fn run(
        &self,
        service: &dyn DispatchTarget,
        method: &str,
        chunk: &Chunk,
        extra_args: &[Value],
        context: &ExecutionContext,
    ) -> DispatcherResult<()> {
        context.ensure_results_initialized();

        self.logger.log(DispatchEvent::WorkItemStarted {
            batch_id: context.batch_id(),
            method: method.to_string(),
            chunk_index: chunk.index,
            item_count: chunk.len(),
            items: serde_json::to_string(&chunk.items)
                .unwrap_or_else(|_| "[unserializable]".to_string()),
        });

        let started = Instant::now();
        let mut args = Vec::with_capacity(extra_args.len() + 1);
        args.push(Value::Array(chunk.items.clone()));
        args.extend_from_slice(extra_args);

        let value = self.adapter.invoke(service, method, &args)?;
        context.append(ChunkResult::for_chunk(chunk, value));

        self.logger.log(DispatchEvent::WorkItemCompleted {
            batch_id: context.batch_id(),
            method: method.to_string(),
            chunk_index: chunk.index,
            duration_ms: started.elapsed().as_millis() as u64,
        });

        Ok(())
    }
}
