//! # Registry Infrastructure
//!
//! Method metadata and invoke-by-name for wrapped services.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── BatchDescriptor / MethodMetadata   (declared per method, pure data)
//! ├── MetadataRegistry                   ((TypeId, method) side-table)
//! └── ReflectionAdapter                  (metadata lookup + invoke over DispatchTarget)
//! ```

pub mod descriptor;
pub mod metadata_registry;
pub mod reflection;

pub use descriptor::{BatchDescriptor, MethodMetadata};
pub use metadata_registry::{MetadataRegistry, MetadataRegistryStats, MethodKey};
pub use reflection::{DispatchTarget, ReflectionAdapter};
