use proptest::prelude::*;
use serde_json::{json, Value};

/// Collections of mixed JSON scalars, including the empty collection
pub fn collection_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z0-9 +*/-]{0,12}".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
        ],
        0..300,
    )
}

pub fn valid_chunk_size_strategy() -> impl Strategy<Value = i64> {
    1i64..=64
}

pub fn invalid_chunk_size_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0i64), i64::MIN..0i64]
}
