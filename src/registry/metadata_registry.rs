//! # Method Metadata Registry
//!
//! Static side-table mapping `(service type, method name)` to the metadata
//! declared for that method. Populated explicitly at startup; lookups never
//! introspect the service.
//!
//! ## Usage
//!
//! ```rust
//! use batch_dispatch::registry::{BatchDescriptor, MetadataRegistry};
//!
//! struct ReportService;
//!
//! let registry = MetadataRegistry::new();
//! registry.register_batch::<ReportService>("render_rows", BatchDescriptor::with_chunk_size(25));
//!
//! let descriptor = registry.batch_descriptor_for::<ReportService>("render_rows");
//! assert_eq!(descriptor, Some(BatchDescriptor::with_chunk_size(25)));
//! ```

use std::any::{type_name, TypeId};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::descriptor::{BatchDescriptor, MethodMetadata};
use super::reflection::DispatchTarget;

/// Side-table key: concrete service type plus method name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub type_id: TypeId,
    pub method: String,
}

impl MethodKey {
    pub fn new(type_id: TypeId, method: impl Into<String>) -> Self {
        Self {
            type_id,
            method: method.into(),
        }
    }

    pub fn of<T: 'static>(method: impl Into<String>) -> Self {
        Self::new(TypeId::of::<T>(), method)
    }
}

/// Registry statistics for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRegistryStats {
    pub total_methods: usize,
    pub batched_methods: usize,
    pub logged_methods: usize,
}

/// Thread-safe metadata side-table
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: DashMap<MethodKey, MethodMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let a service type declare all of its method metadata.
    pub fn register_target<T: DispatchTarget>(&self) -> &Self {
        T::declare_metadata(self);
        debug!(service_type = type_name::<T>(), "Registered service metadata");
        self
    }

    /// Attach a batch descriptor to `T::method`.
    pub fn register_batch<T: 'static>(&self, method: &str, descriptor: BatchDescriptor) -> &Self {
        self.entries
            .entry(MethodKey::of::<T>(method))
            .or_default()
            .batch = Some(descriptor);
        debug!(
            service_type = type_name::<T>(),
            method = %method,
            chunk_size = ?descriptor.chunk_size,
            "Registered batch descriptor"
        );
        self
    }

    /// Mark `T::method` for invocation logging.
    pub fn register_log_invocation<T: 'static>(&self, method: &str) -> &Self {
        self.entries
            .entry(MethodKey::of::<T>(method))
            .or_default()
            .log_invocation = true;
        self
    }

    /// Metadata declared for a method, if any.
    pub fn metadata(&self, type_id: TypeId, method: &str) -> Option<MethodMetadata> {
        self.entries
            .get(&MethodKey::new(type_id, method))
            .map(|entry| entry.value().clone())
    }

    pub fn batch_descriptor(&self, type_id: TypeId, method: &str) -> Option<BatchDescriptor> {
        self.metadata(type_id, method).and_then(|m| m.batch)
    }

    pub fn batch_descriptor_for<T: 'static>(&self, method: &str) -> Option<BatchDescriptor> {
        self.batch_descriptor(TypeId::of::<T>(), method)
    }

    pub fn logs_invocation(&self, type_id: TypeId, method: &str) -> bool {
        self.metadata(type_id, method)
            .is_some_and(|m| m.log_invocation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> MetadataRegistryStats {
        self.entries.iter().fold(
            MetadataRegistryStats::default(),
            |mut stats, entry| {
                stats.total_methods += 1;
                if entry.is_batched() {
                    stats.batched_methods += 1;
                }
                if entry.log_invocation {
                    stats.logged_methods += 1;
                }
                stats
            },
        )
    }
}
