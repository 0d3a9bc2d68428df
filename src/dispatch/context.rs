//! Shared accumulator for the results of one batch.
//!
//! Every work item of a request holds the same `Arc<ExecutionContext>`. The
//! result sequence is created on first use and only ever appended to, so the
//! engine may run items sequentially or concurrently and in any order.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chunk::Chunk;
use super::work_item::BatchId;

/// One completed work item's return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk_index: usize,
    pub offset: usize,
    pub item_count: usize,
    pub value: Value,
    pub completed_at: DateTime<Utc>,
}

impl ChunkResult {
    pub fn for_chunk(chunk: &Chunk, value: Value) -> Self {
        Self {
            chunk_index: chunk.index,
            offset: chunk.offset,
            item_count: chunk.len(),
            value,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionContext {
    batch_id: BatchId,
    method: String,
    expected_chunks: usize,
    results: OnceLock<Mutex<Vec<ChunkResult>>>,
    created_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(batch_id: BatchId, method: impl Into<String>, expected_chunks: usize) -> Self {
        Self {
            batch_id,
            method: method.into(),
            expected_chunks,
            results: OnceLock::new(),
            created_at: Utc::now(),
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn expected_chunks(&self) -> usize {
        self.expected_chunks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Create the result sequence if no work item has yet. Idempotent and
    /// race-free: concurrent callers all observe the same sequence.
    pub fn ensure_results_initialized(&self) -> &Mutex<Vec<ChunkResult>> {
        self.results
            .get_or_init(|| Mutex::new(Vec::with_capacity(self.expected_chunks)))
    }

    pub fn is_initialized(&self) -> bool {
        self.results.get().is_some()
    }

    pub fn append(&self, result: ChunkResult) {
        self.ensure_results_initialized().lock().push(result);
    }

    /// Snapshot of the results in completion order.
    pub fn results(&self) -> Vec<ChunkResult> {
        self.results
            .get()
            .map(|results| results.lock().clone())
            .unwrap_or_default()
    }

    /// Snapshot of the results re-sorted into original chunk order.
    pub fn results_in_chunk_order(&self) -> Vec<ChunkResult> {
        let mut results = self.results();
        results.sort_by_key(|result| result.chunk_index);
        results
    }

    /// Chunk return values in chunk order. Array values are spliced together,
    /// any other value is kept as one entry.
    pub fn flattened_values(&self) -> Vec<Value> {
        self.results_in_chunk_order()
            .into_iter()
            .flat_map(|result| match result.value {
                Value::Array(items) => items,
                other => vec![other],
            })
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.results
            .get()
            .map_or(0, |results| results.lock().len())
    }

    /// Every expected chunk has reported a result.
    pub fn is_complete(&self) -> bool {
        self.completed_count() >= self.expected_chunks
    }
}
