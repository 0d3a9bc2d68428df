//! # Structured Logging Module
//!
//! Environment-aware structured logging plus the logger collaborator that every
//! dispatcher component receives at construction.
//!
//! Components never reach for a global logger. They hold an
//! `Arc<dyn DispatchLogger>` and hand it [`DispatchEvent`]s; the default
//! [`TracingDispatchLogger`] turns those into `tracing` events.

use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::constants::{events, LOG_CHANNEL};
use crate::dispatch::work_item::BatchId;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber, and
/// an already-installed global subscriber is left in place.
pub fn init_structured_logging(config: &LoggingConfig, environment: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let log_level = resolve_log_level(config, environment);

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let installed = if config.json {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_filter(filter),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(true)
                        .with_filter(filter),
                )
                .try_init()
        };

        if installed.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_level = %log_level,
            json = config.json,
            "Structured logging initialized"
        );
    });
}

/// The configured level, or the default for `environment` when none is set
fn resolve_log_level(config: &LoggingConfig, environment: &str) -> String {
    config
        .level
        .clone()
        .unwrap_or_else(|| get_log_level(environment).to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// A structured event produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// The dispatcher is about to look up batch metadata for a call
    DispatchChecked { service: String, method: String },

    /// No batch metadata: the call is forwarded unchanged
    DirectInvocation { service: String, method: String },

    /// Batch metadata found; emitted before the input is validated or split
    BatchingEnabled {
        service: String,
        method: String,
        /// Declared size, or the configured default when the descriptor has none
        chunk_size: Option<i64>,
    },

    /// Batch metadata found and every chunk registered
    BatchScheduled {
        service: String,
        method: String,
        batch_id: BatchId,
        chunk_size: usize,
        item_count: usize,
        chunk_count: usize,
    },

    WorkItemStarted {
        batch_id: BatchId,
        method: String,
        chunk_index: usize,
        item_count: usize,
        /// JSON rendering of the chunk payload
        items: String,
    },

    WorkItemCompleted {
        batch_id: BatchId,
        method: String,
        chunk_index: usize,
        duration_ms: u64,
    },

    /// A method marked for invocation logging is about to run
    MethodInvoked {
        service: String,
        method: String,
        argument_count: usize,
    },

    MethodReturned {
        service: String,
        method: String,
        duration_ms: u64,
        success: bool,
    },
}

impl DispatchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DispatchChecked { .. } => events::DISPATCH_CHECKED,
            Self::DirectInvocation { .. } => events::DISPATCH_DIRECT,
            Self::BatchingEnabled { .. } => events::DISPATCH_BATCHING_ENABLED,
            Self::BatchScheduled { .. } => events::DISPATCH_BATCH_SCHEDULED,
            Self::WorkItemStarted { .. } => events::WORK_ITEM_STARTED,
            Self::WorkItemCompleted { .. } => events::WORK_ITEM_COMPLETED,
            Self::MethodInvoked { .. } => events::METHOD_INVOKED,
            Self::MethodReturned { .. } => events::METHOD_RETURNED,
        }
    }

    /// The method this event is about
    pub fn method(&self) -> &str {
        match self {
            Self::DispatchChecked { method, .. }
            | Self::DirectInvocation { method, .. }
            | Self::BatchingEnabled { method, .. }
            | Self::BatchScheduled { method, .. }
            | Self::WorkItemStarted { method, .. }
            | Self::WorkItemCompleted { method, .. }
            | Self::MethodInvoked { method, .. }
            | Self::MethodReturned { method, .. } => method,
        }
    }
}

/// Sink for dispatcher events.
///
/// Delivery is fire-and-forget: implementations must not panic and the
/// dispatcher never waits on or checks the outcome of a `log` call.
pub trait DispatchLogger: Send + Sync {
    fn log(&self, event: DispatchEvent);
}

/// Default logger emitting `tracing` events on the dispatcher channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatchLogger;

impl DispatchLogger for TracingDispatchLogger {
    fn log(&self, event: DispatchEvent) {
        match &event {
            DispatchEvent::DispatchChecked { service, method } => {
                tracing::debug!(
                    channel = LOG_CHANNEL,
                    event = event.name(),
                    service = %service,
                    method = %method,
                    "Checking for batch processing metadata in method {method}"
                );
            }
            DispatchEvent::DirectInvocation { service, method } => {
                log_dispatch_operation(event.name(), service, method, false, None);
            }
            DispatchEvent::BatchingEnabled {
                service,
                method,
                chunk_size,
            } => {
                let details = match chunk_size {
                    Some(size) => format!("batch processing enabled with batch size {size}"),
                    None => "batch processing enabled without a batch size".to_string(),
                };
                log_dispatch_operation(event.name(), service, method, true, Some(&details));
            }
            DispatchEvent::BatchScheduled {
                service,
                method,
                batch_id,
                chunk_size,
                item_count,
                chunk_count,
            } => {
                let details = format!(
                    "batch {batch_id}: {item_count} items in {chunk_count} chunks of {chunk_size}"
                );
                log_dispatch_operation(event.name(), service, method, true, Some(&details));
            }
            DispatchEvent::WorkItemStarted {
                batch_id,
                method,
                chunk_index,
                item_count,
                items,
            } => {
                log_work_item_operation(
                    event.name(),
                    batch_id,
                    method,
                    *chunk_index,
                    "started",
                    Some(*item_count),
                    None,
                );
                tracing::trace!(
                    channel = LOG_CHANNEL,
                    batch_id = %batch_id,
                    chunk_index = chunk_index,
                    items = %items,
                    "Processing item in batch for method {method}"
                );
            }
            DispatchEvent::WorkItemCompleted {
                batch_id,
                method,
                chunk_index,
                duration_ms,
            } => {
                log_work_item_operation(
                    event.name(),
                    batch_id,
                    method,
                    *chunk_index,
                    "completed",
                    None,
                    Some(*duration_ms),
                );
            }
            DispatchEvent::MethodInvoked {
                service,
                method,
                argument_count,
            } => {
                tracing::info!(
                    channel = LOG_CHANNEL,
                    event = event.name(),
                    service = %service,
                    method = %method,
                    argument_count = argument_count,
                    "Calling {service}#{method}"
                );
            }
            DispatchEvent::MethodReturned {
                service,
                method,
                duration_ms,
                success,
            } => {
                tracing::info!(
                    channel = LOG_CHANNEL,
                    event = event.name(),
                    service = %service,
                    method = %method,
                    duration_ms = duration_ms,
                    success = success,
                    "{service}#{method} returned"
                );
            }
        }
    }
}

/// Log structured data for a dispatch decision
pub fn log_dispatch_operation(
    operation: &str,
    service: &str,
    method: &str,
    batched: bool,
    details: Option<&str>,
) {
    tracing::info!(
        channel = LOG_CHANNEL,
        operation = %operation,
        service = %service,
        method = %method,
        batched = batched,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

/// Log structured data for a work item transition
pub fn log_work_item_operation(
    operation: &str,
    batch_id: &BatchId,
    method: &str,
    chunk_index: usize,
    status: &str,
    item_count: Option<usize>,
    duration_ms: Option<u64>,
) {
    tracing::info!(
        channel = LOG_CHANNEL,
        operation = %operation,
        batch_id = %batch_id,
        method = %method,
        chunk_index = chunk_index,
        status = %status,
        item_count = item_count,
        duration_ms = duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "WORK_ITEM_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        channel = LOG_CHANNEL,
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
