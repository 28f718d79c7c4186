//! scrawl core library
//!
//! A tiny hierarchical document store that uses the filesystem as its
//! index: collections are directories, documents are directories holding a
//! single serialized content file, and documents can nest further
//! collections arbitrarily deep.
//!
//! # Quick Start
//!
//! ```text
//! let db = Database::open()?;
//!
//! // Write a document
//! db.collection("fish").document("redfish").write(&fish)?;
//!
//! // Read it back
//! let fish: Fish = db.collection("fish").document("redfish").read()?;
//!
//! // List a collection
//! let docs = db.collection("fish").get_all_documents()?;
//! ```
//!
//! Chains are lazy: an empty name or key does not fail immediately but is
//! carried on the handle and returned by the next operation, so a whole
//! path of handles can be built before any error surfaces.
//!
//! Writes are atomic per document (temp file plus rename) and serialized
//! per path; reads are lock-free unless configured otherwise. See
//! [`config::ReadConsistency`].
//!
//! # Modules
//!
//! - `database`: entry point, root handle
//! - `collection` / `document`: the chained handle types
//! - `codec`: pluggable value serialization (JSON, CBOR)
//! - `storage`: path namespace, lock registry, atomic persistence
//! - `config`: database configuration

pub mod codec;
pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod storage;

pub use codec::{CborCodec, Codec, CodecError, JsonCodec};
pub use collection::Collection;
pub use config::{Config, ReadConsistency};
pub use database::Database;
pub use document::Document;
pub use storage::{LockRegistry, StoreError, StoreResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
