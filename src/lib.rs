#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Dispatch
//!
//! Metadata-driven method dispatcher that turns one call over a large
//! collection into many chunked work items.
//!
//! ## Overview
//!
//! A [`BatchDispatcher`] sits in front of a service implementing
//! [`DispatchTarget`]. For every call it consults the [`MetadataRegistry`]:
//!
//! - methods without a batch descriptor are forwarded unchanged and their
//!   return value is handed straight back;
//! - methods carrying a [`BatchDescriptor`] get their first argument split into
//!   chunks of the declared size, one [`WorkItem`] per chunk is registered with
//!   an [`ExecutionEngine`], and every work item appends its return value to a
//!   shared [`ExecutionContext`].
//!
//! ## Module Organization
//!
//! - [`registry`] - Method metadata and invoke-by-name
//! - [`dispatch`] - Dispatch core, chunking, scheduling and work-item runner
//! - [`engine`] - Execution engine boundary and the in-process engine
//! - [`services`] - Expression service used by the demo binary
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging and the dispatch logger collaborator
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use batch_dispatch::config::DispatcherConfig;
//! use batch_dispatch::engine::InProcessBatchEngine;
//! use batch_dispatch::logging::TracingDispatchLogger;
//! use batch_dispatch::registry::MetadataRegistry;
//! use batch_dispatch::services::ExpressionService;
//! use batch_dispatch::BatchDispatcher;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatcherConfig::default();
//! let registry = Arc::new(MetadataRegistry::new());
//! registry.register_target::<ExpressionService>();
//!
//! let engine = Arc::new(InProcessBatchEngine::new(config.engine.clone()));
//! let dispatcher = BatchDispatcher::new(
//!     Arc::new(ExpressionService),
//!     registry,
//!     engine.clone(),
//!     Arc::new(TracingDispatchLogger),
//!     &config,
//! );
//!
//! let outcome = dispatcher.dispatch("calculate_results", vec![json!(["1 + 2", "3 * 4"])])?;
//! engine.run_to_completion();
//!
//! if let Some(batch) = outcome.batch() {
//!     println!("{:?}", batch.context().flattened_values());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod logging;
pub mod registry;
pub mod services;

pub use config::{ConfigManager, DispatcherConfig};
pub use dispatch::{
    BatchDispatcher, BatchHandle, BatchId, ChunkResult, DispatchOutcome, DispatchRequest,
    ExecutionContext, WorkItem,
};
pub use engine::{BatchBuilder, BatchDefinition, ExecutionEngine, InProcessBatchEngine};
pub use error::{
    DispatchError, DispatcherError, DispatcherResult, EngineError, InvocationError,
    MethodNotFoundError,
};
pub use logging::{DispatchEvent, DispatchLogger, TracingDispatchLogger};
pub use registry::{BatchDescriptor, DispatchTarget, MetadataRegistry, ReflectionAdapter};
