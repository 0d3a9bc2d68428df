//! Work items: one deferred unit of execution per chunk.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::chunk::Chunk;
use super::context::ExecutionContext;
use super::runner::WorkItemRunner;
use crate::error::DispatcherResult;
use crate::registry::DispatchTarget;

/// Identity of one dispatch request's batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chunk bound to the service, method and context it runs against.
///
/// The engine calls [`execute`](Self::execute) once; the item holds the
/// service and the context by shared ownership and owns only its chunk.
pub struct WorkItem {
    batch_id: BatchId,
    service: Arc<dyn DispatchTarget>,
    method: String,
    chunk: Chunk,
    extra_args: Arc<Vec<Value>>,
    runner: Arc<WorkItemRunner>,
    context: Arc<ExecutionContext>,
}

impl WorkItem {
    pub fn new(
        batch_id: BatchId,
        service: Arc<dyn DispatchTarget>,
        method: impl Into<String>,
        chunk: Chunk,
        extra_args: Arc<Vec<Value>>,
        runner: Arc<WorkItemRunner>,
        context: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            batch_id,
            service,
            method: method.into(),
            chunk,
            extra_args,
            runner,
            context,
        }
    }

    /// Run the chunk through the runner. Failures are returned to the engine.
    pub fn execute(&self) -> DispatcherResult<()> {
        self.runner.run(
            self.service.as_ref(),
            &self.method,
            &self.chunk,
            &self.extra_args,
            &self.context,
        )
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk.index
    }

    pub fn extra_args(&self) -> &[Value] {
        &self.extra_args
    }

    pub fn service_name(&self) -> &str {
        self.service.service_name()
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("batch_id", &self.batch_id)
            .field("service", &self.service.service_name())
            .field("method", &self.method)
            .field("chunk_index", &self.chunk.index)
            .field("chunk_len", &self.chunk.len())
            .field("extra_args", &self.extra_args.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids_are_unique_and_display_as_uuid() {
        let a = BatchId::new();
        let b = BatchId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }

    #[test]
    fn test_batch_id_serializes_transparently() {
        let id = BatchId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, Value::String(id.to_string()));
    }

    #[test]
    fn test_work_item_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WorkItem>();
    }
}
