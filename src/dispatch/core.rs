//! # Batch Dispatcher
//!
//! The interception point in front of a wrapped service.
//!
//! ## Dispatch Flow
//!
//! ```text
//! dispatch(method, args)
//!     │
//!     ├── ReflectionAdapter::method_metadata ── unknown method ──► MethodNotFoundError
//!     │
//!     ├── no batch descriptor ──► ReflectionAdapter::invoke ──► DispatchOutcome::Completed
//!     │
//!     └── batch descriptor
//!           ├── DispatchEvent::BatchingEnabled
//!           ├── chunk size check            ── k < 1 ──────────► DispatchError
//!           ├── args[0] as collection       ── not a list ─────► DispatchError
//!           ├── split into chunks of k
//!           └── ChunkScheduler::schedule ──► DispatchOutcome::Scheduled(BatchHandle)
//! ```
//!
//! Every check happens before the first work item is registered, so a failed
//! dispatch never leaves part of a batch behind.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chunk::{extract_batch_arguments, split_by, validate_chunk_size};
use super::runner::WorkItemRunner;
use super::scheduler::{BatchHandle, ChunkScheduler};
use crate::config::{DispatchConfig, DispatcherConfig};
use crate::engine::ExecutionEngine;
use crate::error::DispatcherResult;
use crate::logging::{DispatchEvent, DispatchLogger};
use crate::registry::{BatchDescriptor, DispatchTarget, MetadataRegistry, ReflectionAdapter};

/// One incoming call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub method: String,
    pub args: Vec<Value>,
}

impl DispatchRequest {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// What the dispatcher did with a call
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Forwarded directly; carries the method's return value
    Completed(Value),
    /// Split and registered; results accumulate in the handle's context
    Scheduled(BatchHandle),
}

impl DispatchOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Scheduled(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Scheduled(_) => None,
        }
    }

    pub fn batch(&self) -> Option<&BatchHandle> {
        match self {
            Self::Completed(_) => None,
            Self::Scheduled(handle) => Some(handle),
        }
    }
}

/// Wraps one service and decides per call whether to forward or batch.
pub struct BatchDispatcher {
    service: Arc<dyn DispatchTarget>,
    adapter: Arc<ReflectionAdapter>,
    scheduler: ChunkScheduler,
    logger: Arc<dyn DispatchLogger>,
    config: DispatchConfig,
}

impl BatchDispatcher {
    pub fn new(
        service: Arc<dyn DispatchTarget>,
        registry: Arc<MetadataRegistry>,
        engine: Arc<dyn ExecutionEngine>,
        logger: Arc<dyn DispatchLogger>,
        config: &DispatcherConfig,
    ) -> Self {
        let adapter = Arc::new(ReflectionAdapter::new(registry));
        let runner = Arc::new(WorkItemRunner::new(
            Arc::clone(&adapter),
            Arc::clone(&logger),
        ));
        let scheduler = ChunkScheduler::new(
            engine,
            runner,
            config.batch.clone(),
            Arc::clone(&logger),
        );

        Self {
            service,
            adapter,
            scheduler,
            logger,
            config: config.dispatch.clone(),
        }
    }

    pub fn service(&self) -> &Arc<dyn DispatchTarget> {
        &self.service
    }

    pub fn adapter(&self) -> &Arc<ReflectionAdapter> {
        &self.adapter
    }

    pub fn dispatch_request(&self, request: DispatchRequest) -> DispatcherResult<DispatchOutcome> {
        self.dispatch(&request.method, request.args)
    }

    /// Call `method` on the wrapped service, batching it if it carries a
    /// batch descriptor.
    pub fn dispatch(&self, method: &str, args: Vec<Value>) -> DispatcherResult<DispatchOutcome> {
        let service_name = self.service.service_name().to_string();
        self.logger.log(DispatchEvent::DispatchChecked {
            service: service_name.clone(),
            method: method.to_string(),
        });

        let metadata = self.adapter.method_metadata(self.service.as_ref(), method)?;

        match metadata.batch {
            None => {
                self.logger.log(DispatchEvent::DirectInvocation {
                    service: service_name,
                    method: method.to_string(),
                });
                let value = if metadata.log_invocation {
                    self.invoke_logged(method, &args)?
                } else {
                    self.adapter.invoke(self.service.as_ref(), method, &args)?
                };
                Ok(DispatchOutcome::Completed(value))
            }
            Some(descriptor) => self
                .dispatch_batched(method, descriptor, args)
                .map(DispatchOutcome::Scheduled),
        }
    }

    fn dispatch_batched(
        &self,
        method: &str,
        descriptor: BatchDescriptor,
        args: Vec<Value>,
    ) -> DispatcherResult<BatchHandle> {
        self.logger.log(DispatchEvent::BatchingEnabled {
            service: self.service.service_name().to_string(),
            method: method.to_string(),
            chunk_size: descriptor.chunk_size.or(
                (!self.config.require_explicit_chunk_size)
                    .then_some(self.config.default_chunk_size),
            ),
        });

        let declared = descriptor.effective_chunk_size(
            method,
            self.config.default_chunk_size,
            self.config.require_explicit_chunk_size,
        )?;
        let chunk_size = validate_chunk_size(declared)?;

        let arguments = extract_batch_arguments(method, args)?;
        let item_count = arguments.collection.len();
        let chunks = split_by(arguments.collection, chunk_size);

        self.scheduler.schedule(
            Arc::clone(&self.service),
            method,
            chunks,
            arguments.extra_args,
            chunk_size.get(),
            item_count,
        )
    }

    fn invoke_logged(&self, method: &str, args: &[Value]) -> DispatcherResult<Value> {
        let service_name = self.service.service_name().to_string();
        self.logger.log(DispatchEvent::MethodInvoked {
            service: service_name.clone(),
            method: method.to_string(),
            argument_count: args.len(),
        });

        let started = Instant::now();
        let result = self.adapter.invoke(self.service.as_ref(), method, args);

        self.logger.log(DispatchEvent::MethodReturned {
            service: service_name,
            method: method.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            success: result.is_ok(),
        });
        result
    }
}
