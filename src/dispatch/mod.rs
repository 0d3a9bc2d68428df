//! # Batch Dispatch
//!
//! Decides per call whether a method runs directly or is split into chunked
//! work items, and runs those work items when the engine asks.
//!
//! ## Overview
//!
//! 1. **Dispatch core** ([`BatchDispatcher`]): looks up method metadata and
//!    either forwards the call or hands the input collection to the scheduler
//! 2. **Chunk scheduler** ([`ChunkScheduler`]): partitions the collection and
//!    registers one [`WorkItem`] per chunk, in order
//! 3. **Work-item runner** ([`WorkItemRunner`]): invoked by the engine per
//!    chunk; appends the return value to the shared [`ExecutionContext`]

pub mod chunk;
pub mod context;
pub mod core;
pub mod runner;
pub mod scheduler;
pub mod work_item;

pub use chunk::{
    extract_batch_arguments, split, split_by, validate_chunk_size, BatchArguments, Chunk,
};
pub use context::{ChunkResult, ExecutionContext};
pub use core::{BatchDispatcher, DispatchOutcome, DispatchRequest};
pub use runner::WorkItemRunner;
pub use scheduler::{BatchHandle, ChunkScheduler};
pub use work_item::{BatchId, WorkItem};
