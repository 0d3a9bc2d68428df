//! Declarative method metadata.
//!
//! A [`BatchDescriptor`] is the Rust counterpart of an annotation on a method:
//! plain data with no behavior. It is never validated at declaration time; the
//! dispatcher checks the chunk size the first time the method is called.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Declared intent to batch a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchDescriptor {
    /// Declared chunk size; `None` defers to the configured default
    pub chunk_size: Option<i64>,
}

impl BatchDescriptor {
    /// Descriptor with an explicit chunk size.
    pub const fn with_chunk_size(chunk_size: i64) -> Self {
        Self {
            chunk_size: Some(chunk_size),
        }
    }

    /// Descriptor that uses whatever default the dispatcher is configured with.
    pub const fn with_default_size() -> Self {
        Self { chunk_size: None }
    }

    /// Resolve the chunk size to use for `method`.
    ///
    /// Returns the raw declared or default value; range checks happen in
    /// [`crate::dispatch::chunk::validate_chunk_size`].
    pub fn effective_chunk_size(
        &self,
        method: &str,
        default_chunk_size: i64,
        require_explicit: bool,
    ) -> Result<i64, DispatchError> {
        match self.chunk_size {
            Some(size) => Ok(size),
            None if require_explicit => Err(DispatchError::MissingChunkSize {
                method: method.to_string(),
            }),
            None => Ok(default_chunk_size),
        }
    }
}

/// Everything declared about one method of one service type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Present when calls should be chunked
    pub batch: Option<BatchDescriptor>,

    /// Bracket direct calls with invocation/return log events
    pub log_invocation: bool,
}

impl MethodMetadata {
    pub fn is_batched(&self) -> bool {
        self.batch.is_some()
    }
}
