//! # Reflection Adapter
//!
//! Invoke-by-name over services that expose an explicit method table.
//!
//! ## Separation of Concerns
//!
//! ```text
//! DispatchTarget                 MetadataRegistry               ReflectionAdapter
//! ├── service_name()             (TypeId, method) -> metadata   ├── has_batch_metadata()
//! ├── supported_methods()                                       ├── get_batch_metadata()
//! └── invoke(method, args)                                      └── invoke()
//! ```
//!
//! Services know how to run their own methods; the registry knows what was
//! declared about them; the adapter combines the two and is the only place the
//! dispatcher asks either question.

use std::any::TypeId;
use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{BatchDescriptor, MethodMetadata};
use super::metadata_registry::MetadataRegistry;
use crate::error::{DispatchError, DispatcherResult, InvocationError, MethodNotFoundError};

/// A service whose methods can be called by name.
///
/// Arguments and results are JSON values so the dispatcher can forward calls
/// to methods it has never seen. The first argument of a batched method is
/// the collection being chunked.
pub trait DispatchTarget: Send + Sync + 'static {
    /// Name used in logs and errors
    fn service_name(&self) -> &str;

    /// Every method `invoke` accepts
    fn supported_methods(&self) -> Vec<&str>;

    fn supports_method(&self, method: &str) -> bool {
        self.supported_methods().contains(&method)
    }

    /// Run `method` synchronously with positional `args`.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError>;

    /// Concrete type of the service, used as the metadata key.
    fn service_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Declare method metadata for this service type.
    fn declare_metadata(_registry: &MetadataRegistry)
    where
        Self: Sized,
    {
    }
}

/// Metadata lookup and invocation for any [`DispatchTarget`].
#[derive(Debug, Clone)]
pub struct ReflectionAdapter {
    registry: Arc<MetadataRegistry>,
}

impl ReflectionAdapter {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Fail with [`MethodNotFoundError`] unless `target` exposes `method`.
    pub fn ensure_method(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
    ) -> Result<(), MethodNotFoundError> {
        if target.supports_method(method) {
            Ok(())
        } else {
            Err(MethodNotFoundError::new(target.service_name(), method)
                .with_supported_methods(target.supported_methods()))
        }
    }

    /// All metadata declared for `method`; an undeclared method gets the empty default.
    pub fn method_metadata(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
    ) -> Result<MethodMetadata, MethodNotFoundError> {
        self.ensure_method(target, method)?;
        Ok(self
            .registry
            .metadata(target.service_type(), method)
            .unwrap_or_default())
    }

    /// True iff `method` carries a batch descriptor.
    pub fn has_batch_metadata(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
    ) -> Result<bool, MethodNotFoundError> {
        Ok(self.method_metadata(target, method)?.is_batched())
    }

    /// The batch descriptor of `method`. Callers check
    /// [`has_batch_metadata`](Self::has_batch_metadata) first; an undecorated
    /// method yields [`DispatchError::MissingDescriptor`].
    pub fn get_batch_metadata(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
    ) -> DispatcherResult<BatchDescriptor> {
        self.batch_metadata(target, method)?.ok_or_else(|| {
            DispatchError::MissingDescriptor {
                method: method.to_string(),
            }
            .into()
        })
    }

    /// Combined check-and-get.
    pub fn batch_metadata(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
    ) -> Result<Option<BatchDescriptor>, MethodNotFoundError> {
        Ok(self.method_metadata(target, method)?.batch)
    }

    /// Call `method` and return its result. A failure raised by the method is
    /// returned as-is inside [`crate::error::DispatcherError::Invocation`].
    pub fn invoke(
        &self,
        target: &dyn DispatchTarget,
        method: &str,
        args: &[Value],
    ) -> DispatcherResult<Value> {
        self.ensure_method(target, method)?;
        Ok(target.invoke(method, args)?)
    }
}
