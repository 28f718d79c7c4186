//! Storage subsystem
//!
//! The filesystem is the index: collections are directories, documents are
//! directories holding one content file, and the nesting of directories is
//! the nesting of the namespace. This module owns path resolution, the
//! per-path lock registry, and the atomic write / read / delete / list
//! primitives the handle types are built on.

mod engine;
mod error;
mod locks;
mod paths;

pub use error::{StoreError, StoreResult};
pub use locks::LockRegistry;

pub(crate) use engine::StorageEngine;
pub(crate) use error::{Fault, FaultKind};
pub(crate) use paths::{clean, resolve_collection, resolve_document};
