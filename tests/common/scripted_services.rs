//! Small services with predictable behavior for dispatcher tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use batch_dispatch::registry::{BatchDescriptor, DispatchTarget, MetadataRegistry};
use batch_dispatch::InvocationError;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Echoes its input back and records every call.
///
/// - `echo`: not batched, returns `args[0]`
/// - `batch_echo`: batched (size 10), returns `args[0]`
/// - `batch_default`: batched with no declared size
/// - `batch_zero`, `batch_negative`: batched with an invalid size
/// - `batch_with_extras`: batched (size 2), returns `{chunk, extras}`
/// - `logged_sum`: not batched, invocation logging on
#[derive(Debug, Default)]
pub struct EchoService {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl EchoService {
    pub const NAME: &'static str = "EchoService";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl DispatchTarget for EchoService {
    fn service_name(&self) -> &str {
        Self::NAME
    }

    fn supported_methods(&self) -> Vec<&str> {
        vec![
            "echo",
            "batch_echo",
            "batch_default",
            "batch_zero",
            "batch_negative",
            "batch_with_extras",
            "logged_sum",
        ]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        self.calls.lock().push((method.to_string(), args.to_vec()));
        let first = args.first().cloned().unwrap_or(Value::Null);

        match method {
            "batch_with_extras" => Ok(json!({ "chunk": first, "extras": args[1..].to_vec() })),
            "logged_sum" => {
                let total: i64 = first
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_i64).sum())
                    .ok_or_else(|| {
                        InvocationError::invalid_arguments(Self::NAME, method, "expected an array")
                    })?;
                Ok(json!(total))
            }
            _ => Ok(first),
        }
    }

    fn declare_metadata(registry: &MetadataRegistry) {
        registry
            .register_batch::<Self>("batch_echo", BatchDescriptor::with_chunk_size(10))
            .register_batch::<Self>("batch_default", BatchDescriptor::with_default_size())
            .register_batch::<Self>("batch_zero", BatchDescriptor::with_chunk_size(0))
            .register_batch::<Self>("batch_negative", BatchDescriptor::with_chunk_size(-5))
            .register_batch::<Self>("batch_with_extras", BatchDescriptor::with_chunk_size(2))
            .register_log_invocation::<Self>("logged_sum");
    }
}

/// Batched `process` (size 5) that fails on chunks containing `"boom"`.
#[derive(Debug, Default)]
pub struct FlakyService {
    attempts: AtomicUsize,
}

impl FlakyService {
    pub const NAME: &'static str = "FlakyService";

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DispatchTarget for FlakyService {
    fn service_name(&self) -> &str {
        Self::NAME
    }

    fn supported_methods(&self) -> Vec<&str> {
        vec!["process", "fail_direct"]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if method == "fail_direct" {
            return Err(InvocationError::new(Self::NAME, method, "direct failure")
                .with_error_code("scripted"));
        }

        let items = args.first().and_then(Value::as_array).cloned().unwrap_or_default();
        if items.iter().any(|item| item == "boom") {
            return Err(InvocationError::new(Self::NAME, method, "chunk contains boom"));
        }
        Ok(json!(items.len()))
    }

    fn declare_metadata(registry: &MetadataRegistry) {
        registry.register_batch::<Self>("process", BatchDescriptor::with_chunk_size(5));
    }
}
