//! Error types for the batch dispatcher.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigurationError;

/// The requested method does not exist on the wrapped service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_method_not_found(.service, .method, .supported_methods))]
pub struct MethodNotFoundError {
    /// Name of the service that was asked
    pub service: String,

    /// The method that could not be resolved
    pub method: String,

    /// Methods the service does expose (for hint)
    pub supported_methods: Vec<String>,
}

fn render_method_not_found(service: &str, method: &str, supported: &[String]) -> String {
    let mut message = format!("Method '{method}' not found on service '{service}'");
    if !supported.is_empty() {
        message.push_str(&format!(" (supported: {})", supported.join(", ")));
    }
    message
}

impl MethodNotFoundError {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            supported_methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_supported_methods(mut self, methods: Vec<&str>) -> Self {
        self.supported_methods = methods.into_iter().map(String::from).collect();
        self
    }
}

/// Malformed input to the chunking path.
///
/// Every variant is raised before any work item is registered, so a
/// `DispatchError` never leaves a partially scheduled batch behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid chunk size {chunk_size}: chunk size must be at least 1")]
    InvalidChunkSize { chunk_size: i64 },

    #[error("Method '{method}' declares batch processing without a chunk size and explicit sizes are required")]
    MissingChunkSize { method: String },

    #[error("Method '{method}' has no batch descriptor")]
    MissingDescriptor { method: String },

    #[error("Batchable argument for '{method}' must be an ordered sequence, got {found}")]
    NotASequence { method: String, found: String },
}

/// Failure raised by the wrapped method itself.
///
/// The dispatcher hands this value back exactly as the service produced it so
/// callers can tell a failing operation apart from failing batch machinery.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Invocation of '{service}#{method}' failed: {message}")]
pub struct InvocationError {
    pub service: String,
    pub method: String,
    pub message: String,
    /// Optional machine-readable code supplied by the service
    pub error_code: Option<String>,
}

impl InvocationError {
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            message: message.into(),
            error_code: None,
        }
    }

    /// Shorthand for an argument the service could not accept.
    pub fn invalid_arguments(
        service: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(service, method, message).with_error_code("invalid_arguments")
    }

    #[must_use]
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// The execution engine refused or could not find a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Batch registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("Engine worker failed: {0}")]
    WorkerFailed(String),
}

/// Top-level error for every dispatcher operation.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error(transparent)]
    MethodNotFound(#[from] MethodNotFoundError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl DispatcherError {
    /// The underlying service failure, if this error is one.
    pub fn as_invocation(&self) -> Option<&InvocationError> {
        match self {
            DispatcherError::Invocation(error) => Some(error),
            _ => None,
        }
    }

    /// Short classification used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatcherError::MethodNotFound(_) => "method_not_found",
            DispatcherError::Dispatch(_) => "dispatch",
            DispatcherError::Invocation(_) => "invocation",
            DispatcherError::Engine(_) => "engine",
            DispatcherError::Configuration(_) => "configuration",
        }
    }
}

pub type DispatcherResult<T> = std::result::Result<T, DispatcherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_display_lists_supported_methods() {
        let error = MethodNotFoundError::new("ExpressionService", "unknown")
            .with_supported_methods(vec!["evaluate", "calculate_results"]);

        let display = error.to_string();
        assert!(display.contains("unknown"));
        assert!(display.contains("ExpressionService"));
        assert!(display.contains("evaluate, calculate_results"));
    }

    #[test]
    fn test_method_not_found_display_without_hint() {
        let error = MethodNotFoundError::new("Svc", "missing");
        assert_eq!(error.to_string(), "Method 'missing' not found on service 'Svc'");
    }

    #[test]
    fn test_invocation_error_is_preserved_through_dispatcher_error() {
        let original = InvocationError::new("Svc", "run", "boom").with_error_code("E42");
        let wrapped: DispatcherError = original.clone().into();

        assert_eq!(wrapped.as_invocation(), Some(&original));
        assert_eq!(wrapped.to_string(), original.to_string());
        assert_eq!(wrapped.kind(), "invocation");
    }

    #[test]
    fn test_dispatch_error_kind() {
        let error: DispatcherError = DispatchError::InvalidChunkSize { chunk_size: 0 }.into();
        assert_eq!(error.kind(), "dispatch");
        assert!(error.as_invocation().is_none());
        assert!(error.to_string().contains("at least 1"));
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatcherError>();
        assert_send_sync::<InvocationError>();
    }
}
