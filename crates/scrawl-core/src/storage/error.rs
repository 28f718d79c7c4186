//! Storage error handling
//!
//! Typed errors for every storage operation, with path context attached
//! wherever a filesystem object is involved. Also defines the sticky
//! [`Fault`] carried by Collection/Document handles built from invalid
//! names, which surfaces as an error on the handle's next operation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A collection was requested with an empty name
    #[error("collection name is empty")]
    EmptyName,

    /// A document was requested with an empty key
    #[error("document key is empty")]
    EmptyKey,

    /// The handle resolves to an empty path, so there is nowhere to store
    /// or read a record
    #[error("no storage location: handle resolves to an empty path")]
    NoStorageLocation,

    /// Expected file or directory is missing
    #[error("not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Failed to create a document directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing a path
    #[error("permission denied: cannot access '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error("disk full or quota exceeded while writing to '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a content file
    #[error("failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a temporary content file
    #[error("failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The write-then-rename sequence failed at the rename step
    #[error("atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Encoding a value for storage failed
    #[error("failed to encode document value")]
    Encode {
        #[source]
        source: CodecError,
    },

    /// Decoding a stored content file failed
    #[error("failed to decode document at '{path}'")]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// An error inherited from an ancestor handle in the chain
    #[error("operation on a handle with an inherited error")]
    Inherited {
        #[source]
        source: Box<StoreError>,
    },

    /// Generic I/O error with path context
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Classify a write-side I/O error by its kind
    pub(crate) fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            _ if is_disk_full_error(&error) => StoreError::DiskFull {
                path,
                source: error,
            },
            _ => StoreError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// True if the target file or directory was missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// True if this error was inherited from an ancestor handle
    pub fn is_inherited(&self) -> bool {
        matches!(self, StoreError::Inherited { .. })
    }
}

/// Check if an I/O error indicates a disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What invalidated a handle at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultKind {
    EmptyName,
    EmptyKey,
}

/// Sticky error carried by a Collection/Document handle
///
/// Set when a handle is built from an empty name or key, or inherited from a
/// faulted ancestor. The first operation on the handle returns it instead of
/// touching the filesystem; it always takes priority over any later check.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fault {
    kind: FaultKind,
    inherited: bool,
}

impl Fault {
    pub(crate) fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            inherited: false,
        }
    }

    /// The fault as seen by a descendant handle
    pub(crate) fn inherit(self) -> Self {
        Self {
            inherited: true,
            ..self
        }
    }

    pub(crate) fn to_error(self) -> StoreError {
        let base = match self.kind {
            FaultKind::EmptyName => StoreError::EmptyName,
            FaultKind::EmptyKey => StoreError::EmptyKey,
        };
        if self.inherited {
            StoreError::Inherited {
                source: Box::new(base),
            }
        } else {
            base
        }
    }
}
