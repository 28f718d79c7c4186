//! Document handles
//!
//! A document is a single stored value, realized as a directory containing
//! one content file plus any nested collections. Handles are transient
//! value objects: descending a chain resolves paths but performs no
//! filesystem work and no existence checks until a leaf operation runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, JsonCodec};
use crate::collection::Collection;
use crate::database::Shared;
use crate::storage::{resolve_collection, Fault, FaultKind, StoreResult};

/// A handle to a single document
///
/// Obtained from [`Collection::document`] or as the database root. If the
/// chain that produced this handle contained an empty name or key, the
/// handle carries that fault and every operation returns it instead of
/// touching storage.
#[derive(Debug)]
pub struct Document<C: Codec = JsonCodec> {
    shared: Arc<Shared<C>>,
    path: PathBuf,
    fault: Option<Fault>,
}

impl<C: Codec> Document<C> {
    pub(crate) fn new(shared: Arc<Shared<C>>, path: PathBuf, fault: Option<Fault>) -> Self {
        Self {
            shared,
            path,
            fault,
        }
    }

    /// The directory this document is (or would be) stored at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Descend into a collection nested under this document
    ///
    /// An existing fault on this handle takes priority over the
    /// empty-name check and is passed down as inherited.
    pub fn collection(&self, name: &str) -> Collection<C> {
        if let Some(fault) = self.fault {
            return Collection::new(
                Arc::clone(&self.shared),
                self.path.clone(),
                Some(fault.inherit()),
            );
        }

        match resolve_collection(&self.path, name) {
            Ok(path) => Collection::new(Arc::clone(&self.shared), path, None),
            Err(_) => Collection::new(
                Arc::clone(&self.shared),
                self.path.clone(),
                Some(Fault::new(FaultKind::EmptyName)),
            ),
        }
    }

    /// Atomically replace this document's value
    ///
    /// The whole value is written every time; there is no partial update.
    pub fn write<T: Serialize>(&self, value: &T) -> StoreResult<()> {
        self.check()?;
        self.shared.engine.write(&self.path, value)
    }

    /// Read and decode this document's value
    pub fn read<T: DeserializeOwned>(&self) -> StoreResult<T> {
        self.check()?;
        self.shared.engine.read(&self.path)
    }

    /// Delete this document and everything nested beneath it
    pub fn delete(&self) -> StoreResult<()> {
        self.check()?;
        self.shared.engine.delete(&self.path)
    }

    fn check(&self) -> StoreResult<()> {
        match self.fault {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }
}

impl<C: Codec> Clone for Document<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            path: self.path.clone(),
            fault: self.fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ReadConsistency};
    use crate::database::Database;
    use crate::storage::StoreError;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Fish {
        kind: String,
    }

    fn open_db(dir: &TempDir) -> Database {
        Database::open_with_config(Config {
            data_dir: dir.path().join("db"),
            read_consistency: ReadConsistency::Unlocked,
            sweep_on_open: false,
        })
        .unwrap()
    }

    fn red() -> Fish {
        Fish {
            kind: "red".to_string(),
        }
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        db.collection("fish").document("redfish").write(&red()).unwrap();
        let fish: Fish = db.collection("fish").document("redfish").read().unwrap();
        assert_eq!(fish, red());
    }

    #[test]
    fn test_nested_collections_under_a_document() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let tooth = db
            .collection("fish")
            .document("purple")
            .collection("teeth")
            .document("3");
        tooth.write(&red()).unwrap();

        let loaded: Fish = db
            .collection("fish")
            .document("purple")
            .collection("teeth")
            .document("3")
            .read()
            .unwrap();
        assert_eq!(loaded, red());
    }

    #[test]
    fn test_document_with_value_and_nested_collection() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let doc = db.collection("fish").document("purple");
        doc.write(&red()).unwrap();
        doc.collection("teeth").document("3").write(&red()).unwrap();

        // Both the content file and the nested tree coexist
        let fish: Fish = doc.read().unwrap();
        assert_eq!(fish, red());
        let tooth: Fish = doc.collection("teeth").document("3").read().unwrap();
        assert_eq!(tooth, red());
    }

    #[test]
    fn test_empty_key_is_deferred_until_the_operation() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let doc = db.collection("fish").document("");
        let err = doc.write(&red()).unwrap_err();
        assert!(matches!(err, StoreError::EmptyKey));

        // No file was created under "fish"
        assert!(!db.path().join("fish").exists());
    }

    #[test]
    fn test_empty_name_is_deferred_until_the_operation() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let err = db
            .collection("")
            .document("x")
            .write(&red())
            .unwrap_err();
        assert!(err.is_inherited());
        assert!(!db.path().join("x").exists());
    }

    #[test]
    fn test_fault_propagates_through_deep_chains() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        // The fault originates three levels up; every descendant returns it
        let doc = db
            .collection("fish")
            .document("")
            .collection("teeth")
            .document("3");
        let err = doc.read::<Fish>().unwrap_err();
        assert!(err.is_inherited());
    }

    #[test]
    fn test_fault_takes_priority_over_empty_name() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        // document("") sets EmptyKey; the later collection("") must not
        // replace it with EmptyName
        let err = db
            .collection("fish")
            .document("")
            .collection("")
            .document("x")
            .write(&red())
            .unwrap_err();
        match err {
            StoreError::Inherited { source } => {
                assert!(matches!(*source, StoreError::EmptyKey));
            }
            other => panic!("expected inherited error, got {other}"),
        }
    }

    #[test]
    fn test_read_missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let err = db
            .collection("fish")
            .document("ghost")
            .read::<Fish>()
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_document_removes_nested_collections() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let doc = db.collection("fish").document("purple");
        doc.write(&red()).unwrap();
        doc.collection("teeth").document("3").write(&red()).unwrap();

        doc.delete().unwrap();
        assert!(!db.path().join("fish").join("purple").exists());
        assert!(doc.read::<Fish>().unwrap_err().is_not_found());
    }

    #[test]
    fn test_root_document_is_readable() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        // The root marker is an empty map
        let marker: std::collections::BTreeMap<String, String> = db.root().read().unwrap();
        assert!(marker.is_empty());
    }
}
