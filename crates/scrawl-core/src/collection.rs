//! Collection handles
//!
//! A collection is a named grouping of documents, realized as a directory.
//! It has no persisted metadata of its own; it exists exactly as long as
//! documents live under it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::{Codec, JsonCodec};
use crate::database::Shared;
use crate::document::Document;
use crate::storage::{resolve_document, Fault, FaultKind, StoreResult};

/// A handle to a collection of documents
///
/// Obtained from [`Document::collection`]. Like documents, collection
/// handles are transient and carry any fault picked up earlier in the
/// chain.
pub struct Collection<C: Codec = JsonCodec> {
    shared: Arc<Shared<C>>,
    path: PathBuf,
    fault: Option<Fault>,
}

impl<C: Codec> Collection<C> {
    pub(crate) fn new(shared: Arc<Shared<C>>, path: PathBuf, fault: Option<Fault>) -> Self {
        Self {
            shared,
            path,
            fault,
        }
    }

    /// The directory this collection is (or would be) stored at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A document in this collection by key
    ///
    /// An existing fault on this handle takes priority over the
    /// empty-key check and is passed down as inherited.
    pub fn document(&self, key: &str) -> Document<C> {
        if let Some(fault) = self.fault {
            return Document::new(
                Arc::clone(&self.shared),
                self.path.clone(),
                Some(fault.inherit()),
            );
        }

        match resolve_document(&self.path, key) {
            Ok(path) => Document::new(Arc::clone(&self.shared), path, None),
            Err(_) => Document::new(
                Arc::clone(&self.shared),
                self.path.clone(),
                Some(Fault::new(FaultKind::EmptyKey)),
            ),
        }
    }

    /// All documents in this collection
    ///
    /// Handles come back in directory-listing order, which is
    /// filesystem-defined and not guaranteed sorted or stable. Nothing is
    /// opened or decoded; each handle reads lazily on demand.
    pub fn get_all_documents(&self) -> StoreResult<Vec<Document<C>>> {
        self.check()?;
        let entries = self.shared.engine.list(&self.path)?;
        Ok(self.bind(entries))
    }

    /// Documents at positions `[start, end)` of the directory listing
    ///
    /// `end == 0` means no upper bound; an `end` past the entry count is
    /// clamped to it. A `start` at or past the (clamped) end yields an
    /// empty vector rather than an error.
    pub fn get_documents(&self, start: usize, end: usize) -> StoreResult<Vec<Document<C>>> {
        self.check()?;
        let mut entries = self.shared.engine.list(&self.path)?;

        let len = entries.len();
        let end = if end == 0 { len } else { end.min(len) };
        let start = start.min(end);

        entries.truncate(end);
        entries.drain(..start);
        Ok(self.bind(entries))
    }

    /// Delete this collection and every document beneath it
    pub fn delete(&self) -> StoreResult<()> {
        self.check()?;
        self.shared.engine.delete(&self.path)
    }

    /// Wrap listed entry paths into lazily-bound document handles
    fn bind(&self, entries: Vec<PathBuf>) -> Vec<Document<C>> {
        entries
            .into_iter()
            .map(|path| Document::new(Arc::clone(&self.shared), path, None))
            .collect()
    }

    fn check(&self) -> StoreResult<()> {
        match self.fault {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }
}

impl<C: Codec> Clone for Collection<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            path: self.path.clone(),
            fault: self.fault,
        }
    }
}
