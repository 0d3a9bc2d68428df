//! Partitioning a batchable collection into ordered chunks.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;

/// A contiguous, ordered slice of the original collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position among the chunks of one request (0-based)
    pub index: usize,
    /// Position of the first item in the original collection
    pub offset: usize,
    pub items: Vec<Value>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The positional arguments of a batched call, split into the collection that
/// gets chunked and the arguments every chunk invocation receives unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchArguments {
    pub collection: Vec<Value>,
    pub extra_args: Vec<Value>,
}

/// Check a chunk size on first use.
pub fn validate_chunk_size(chunk_size: i64) -> Result<NonZeroUsize, DispatchError> {
    usize::try_from(chunk_size)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(DispatchError::InvalidChunkSize { chunk_size })
}

/// Split `collection` into chunks of `chunk_size` items; the last may be shorter.
///
/// An empty collection yields no chunks. A chunk size below 1 fails before
/// anything is produced.
pub fn split(collection: Vec<Value>, chunk_size: i64) -> Result<Vec<Chunk>, DispatchError> {
    let size = validate_chunk_size(chunk_size)?;
    Ok(split_by(collection, size))
}

/// Split with an already validated size.
pub fn split_by(collection: Vec<Value>, chunk_size: NonZeroUsize) -> Vec<Chunk> {
    let size = chunk_size.get();
    let mut chunks = Vec::with_capacity(collection.len().div_ceil(size));
    let mut items = collection.into_iter();

    loop {
        let next: Vec<Value> = items.by_ref().take(size).collect();
        if next.is_empty() {
            break;
        }
        chunks.push(Chunk {
            index: chunks.len(),
            offset: chunks.len() * size,
            items: next,
        });
    }

    chunks
}

/// Take `args[0]` as the collection. A missing or `null` first argument is an
/// empty collection; anything else that is not an array is rejected.
pub fn extract_batch_arguments(
    method: &str,
    args: Vec<Value>,
) -> Result<BatchArguments, DispatchError> {
    let mut args = args.into_iter();

    let collection = match args.next() {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DispatchError::NotASequence {
                method: method.to_string(),
                found: json_type_name(&other).to_string(),
            })
        }
    };

    Ok(BatchArguments {
        collection,
        extra_args: args.collect(),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!(i)).collect()
    }

    #[test]
    fn test_split_twenty_five_by_ten() {
        let chunks = split(numbers(25), 10).unwrap();

        let sizes: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].offset, 10);
        assert_eq!(chunks[2].items.first(), Some(&json!(20)));
    }

    #[test]
    fn test_split_by_matches_validated_split() {
        let size = NonZeroUsize::new(4).unwrap();
        let chunks = split_by(numbers(10), size);

        assert_eq!(chunks, split(numbers(10), 4).unwrap());
        let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert!(split_by(Vec::new(), size).is_empty());
    }

    #[test]
    fn test_split_exact_multiple_has_full_last_chunk() {
        let chunks = split(numbers(20), 10).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 10);
    }

    #[test]
    fn test_split_empty_collection() {
        assert!(split(Vec::new(), 10).unwrap().is_empty());
    }

    #[test]
    fn test_split_chunk_larger_than_collection() {
        let chunks = split(numbers(3), 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].items, numbers(3));
    }

    #[test]
    fn test_split_rejects_zero_and_negative_sizes() {
        assert_eq!(
            split(numbers(5), 0),
            Err(DispatchError::InvalidChunkSize { chunk_size: 0 })
        );
        assert_eq!(
            split(numbers(5), -2),
            Err(DispatchError::InvalidChunkSize { chunk_size: -2 })
        );
        // Empty input does not bypass validation.
        assert!(split(Vec::new(), 0).is_err());
    }

    #[test]
    fn test_extract_batch_arguments_keeps_extra_args() {
        let args = extract_batch_arguments("m", vec![json!([1, 2]), json!(3), json!("x")]).unwrap();
        assert_eq!(args.collection, vec![json!(1), json!(2)]);
        assert_eq!(args.extra_args, vec![json!(3), json!("x")]);
    }

    #[test]
    fn test_extract_batch_arguments_missing_or_null_is_empty() {
        assert_eq!(
            extract_batch_arguments("m", vec![]).unwrap(),
            BatchArguments::default()
        );
        let args = extract_batch_arguments("m", vec![Value::Null, json!(2)]).unwrap();
        assert!(args.collection.is_empty());
        assert_eq!(args.extra_args, vec![json!(2)]);
    }

    #[test]
    fn test_extract_batch_arguments_rejects_non_sequence() {
        assert_eq!(
            extract_batch_arguments("calculate", vec![json!({"a": 1})]),
            Err(DispatchError::NotASequence {
                method: "calculate".to_string(),
                found: "object".to_string(),
            })
        );
        assert!(extract_batch_arguments("calculate", vec![json!("1 + 1")]).is_err());
    }
}
