//! Atomic document persistence
//!
//! One document maps to one directory holding a single content file
//! (`doc.<ext>`). Writes go to a temporary sibling (`doc.<ext>.tmp`), are
//! synced, then renamed onto the content filename; the rename is the only
//! mutation point, so a crash at any step leaves either the old content or
//! the new content intact and readers never see a half-written file.
//!
//! Write and delete on the same path are serialized through the
//! [`LockRegistry`]. Reads are lock-free by default; see
//! [`ReadConsistency`] for the stricter mode.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::codec::Codec;
use crate::config::ReadConsistency;

use super::error::{StoreError, StoreResult};
use super::locks::LockRegistry;

/// Basename (without extension) of every content file
const CONTENT_STEM: &str = "doc";

/// Performs the filesystem work behind every document operation
#[derive(Debug)]
pub(crate) struct StorageEngine<C> {
    codec: C,
    locks: LockRegistry,
    consistency: ReadConsistency,
}

impl<C: Codec> StorageEngine<C> {
    pub(crate) fn new(codec: C, locks: LockRegistry, consistency: ReadConsistency) -> Self {
        Self {
            codec,
            locks,
            consistency,
        }
    }

    /// Name of the content file inside a document directory
    pub(crate) fn content_filename(&self) -> String {
        format!("{}.{}", CONTENT_STEM, self.codec.extension())
    }

    /// Name of the transient sibling used during a write
    fn temp_filename(&self) -> String {
        format!("{}.{}.tmp", CONTENT_STEM, self.codec.extension())
    }

    /// Atomically replace the document at `path` with `value`
    pub(crate) fn write<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        if path.as_os_str().is_empty() {
            return Err(StoreError::NoStorageLocation);
        }

        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| StoreError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let lock = self.locks.get_or_create(path);
        // A poisoned lock still excludes other writers; on-disk state is
        // protected by the rename boundary regardless.
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let bytes = self
            .codec
            .encode(value)
            .map_err(|e| StoreError::Encode { source: e })?;

        let target = path.join(self.content_filename());
        let tmp = path.join(self.temp_filename());

        write_temp(&tmp, &bytes)?;

        fs::rename(&tmp, &target).map_err(|e| StoreError::AtomicWriteFailed {
            from: tmp,
            to: target,
            source: e,
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "document written");
        Ok(())
    }

    /// Read and decode the document at `path`
    pub(crate) fn read<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<T> {
        if path.as_os_str().is_empty() {
            return Err(StoreError::NoStorageLocation);
        }

        let lock = match self.consistency {
            ReadConsistency::Serialized => Some(self.locks.get_or_create(path)),
            ReadConsistency::Unlocked => None,
        };
        let _guard = lock
            .as_ref()
            .map(|l| l.lock().unwrap_or_else(|e| e.into_inner()));

        let content = path.join(self.content_filename());
        if fs::metadata(&content).is_err() {
            return Err(StoreError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(&content).map_err(|e| match e.kind() {
            // The content file can vanish between the stat and the read
            // when a delete races ahead of us.
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_path_buf(),
            },
            _ => StoreError::ReadError {
                path: content.clone(),
                source: e,
            },
        })?;

        trace!(path = %path.display(), bytes = bytes.len(), "document read");
        self.codec.decode(&bytes).map_err(|e| StoreError::Decode {
            path: content,
            source: e,
        })
    }

    /// Remove the document or collection at `path`, including everything
    /// beneath it
    pub(crate) fn delete(&self, path: &Path) -> StoreResult<()> {
        let lock = self.locks.get_or_create(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let meta = fs::metadata(path).map_err(|_| StoreError::NotFound {
            path: path.to_path_buf(),
        })?;

        if meta.is_dir() {
            fs::remove_dir_all(path).map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        } else {
            fs::remove_file(path).map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        debug!(path = %path.display(), "deleted");
        Ok(())
    }

    /// List the immediate children of the collection directory at `path`
    ///
    /// Entries come back in whatever order the directory listing yields
    /// them; no sorting is applied and none is guaranteed.
    pub(crate) fn list(&self, path: &Path) -> StoreResult<Vec<PathBuf>> {
        if path.as_os_str().is_empty() {
            return Err(StoreError::NoStorageLocation);
        }

        let lock = match self.consistency {
            ReadConsistency::Serialized => Some(self.locks.get_or_create(path)),
            ReadConsistency::Unlocked => None,
        };
        let _guard = lock
            .as_ref()
            .map(|l| l.lock().unwrap_or_else(|e| e.into_inner()));

        if fs::metadata(path).is_err() {
            return Err(StoreError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let read_dir = fs::read_dir(path).map_err(|e| StoreError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    /// Create the database root and its marker content file on first use
    ///
    /// Returns `true` if the marker was created, `false` if it already
    /// existed.
    pub(crate) fn ensure_root(&self, root: &Path) -> StoreResult<bool> {
        if root.join(self.content_filename()).exists() {
            return Ok(false);
        }

        // Empty-map marker, mirroring an empty document in either codec.
        let marker: BTreeMap<String, String> = BTreeMap::new();
        self.write(root, &marker)?;
        debug!(root = %root.display(), "database root created");
        Ok(true)
    }

    /// Remove orphaned `doc.<ext>.tmp` files left behind by a crash
    /// mid-write, walking the whole tree under `root`
    ///
    /// Returns the number of files removed.
    pub(crate) fn sweep_temp_files(&self, root: &Path) -> StoreResult<usize> {
        let temp_name = self.temp_filename();
        let mut removed = 0;
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let read_dir = fs::read_dir(&dir).map_err(|e| StoreError::ReadError {
                path: dir.clone(),
                source: e,
            })?;

            for entry in read_dir {
                let entry = entry.map_err(|e| StoreError::ReadError {
                    path: dir.clone(),
                    source: e,
                })?;
                let file_type = entry.file_type().map_err(|e| StoreError::ReadError {
                    path: entry.path(),
                    source: e,
                })?;

                if file_type.is_dir() {
                    stack.push(entry.path());
                } else if entry.file_name() == temp_name.as_str() {
                    fs::remove_file(entry.path()).map_err(|e| StoreError::Io {
                        path: entry.path(),
                        source: e,
                    })?;
                    warn!(path = %entry.path().display(), "removed orphaned temp file");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/// Write bytes to the temporary file and sync it to disk
///
/// The sync must happen before the rename so the rename publishes fully
/// durable content.
fn write_temp(tmp: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = File::create(tmp).map_err(|e| StoreError::from_io(e, tmp.to_path_buf()))?;
    file.write_all(bytes)
        .map_err(|e| StoreError::from_io(e, tmp.to_path_buf()))?;
    file.sync_all()
        .map_err(|e| StoreError::from_io(e, tmp.to_path_buf()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CborCodec, JsonCodec};
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Fish {
        kind: String,
    }

    fn json_engine() -> StorageEngine<JsonCodec> {
        StorageEngine::new(JsonCodec, LockRegistry::new(), ReadConsistency::Unlocked)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let path = dir.path().join("fish").join("redfish");

        let fish = Fish {
            kind: "red".to_string(),
        };
        engine.write(&path, &fish).unwrap();

        let loaded: Fish = engine.read(&path).unwrap();
        assert_eq!(loaded, fish);
        assert!(path.join("doc.json").exists());
    }

    #[test]
    fn test_cbor_round_trip() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::new(CborCodec, LockRegistry::new(), ReadConsistency::Unlocked);
        let path = dir.path().join("fish").join("bluefish");

        let fish = Fish {
            kind: "blue".to_string(),
        };
        engine.write(&path, &fish).unwrap();

        let loaded: Fish = engine.read(&path).unwrap();
        assert_eq!(loaded, fish);
        assert!(path.join("doc.cbor").exists());
    }

    #[test]
    fn test_overwrite_leaves_only_second_value() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let path = dir.path().join("fish").join("onefish");

        engine
            .write(
                &path,
                &Fish {
                    kind: "red".to_string(),
                },
            )
            .unwrap();
        engine
            .write(
                &path,
                &Fish {
                    kind: "blue".to_string(),
                },
            )
            .unwrap();

        let loaded: Fish = engine.read(&path).unwrap();
        assert_eq!(loaded.kind, "blue");
        // No temp residue after a successful write
        assert!(!path.join("doc.json.tmp").exists());
    }

    #[test]
    fn test_write_empty_path_fails() {
        let engine = json_engine();
        let err = engine
            .write(
                Path::new(""),
                &Fish {
                    kind: "red".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NoStorageLocation));
    }

    #[test]
    fn test_read_missing_document() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let err = engine
            .read::<Fish>(&dir.path().join("nothing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_decode_failure() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let path = dir.path().join("broken");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("doc.json"), b"{ corrupt").unwrap();

        let err = engine.read::<Fish>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_delete_removes_subtree() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let path = dir.path().join("fish").join("onefish");
        let nested = path.join("teeth").join("molar");

        engine
            .write(
                &path,
                &Fish {
                    kind: "red".to_string(),
                },
            )
            .unwrap();
        engine
            .write(
                &nested,
                &Fish {
                    kind: "enamel".to_string(),
                },
            )
            .unwrap();

        engine.delete(&path).unwrap();
        assert!(!path.exists());
        assert!(engine.read::<Fish>(&nested).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_missing_path() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let err = engine.delete(&dir.path().join("ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_plain_file() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let stray = dir.path().join("stray.txt");
        fs::write(&stray, b"stray").unwrap();

        engine.delete(&stray).unwrap();
        assert!(!stray.exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn test_list_missing_collection() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let err = engine.list(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_returns_children() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let collection = dir.path().join("fish");

        for name in ["onefish", "twofish", "redfish"] {
            engine
                .write(
                    &collection.join(name),
                    &Fish {
                        kind: name.to_string(),
                    },
                )
                .unwrap();
        }

        let entries = engine.list(&collection).unwrap();
        assert_eq!(entries.len(), 3);
        for entry in entries {
            assert!(entry.starts_with(&collection));
        }
    }

    #[test]
    fn test_ensure_root_creates_marker_once() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let root = dir.path().join("db");

        assert!(engine.ensure_root(&root).unwrap());
        assert!(root.join("doc.json").exists());

        // Second call short-circuits
        assert!(!engine.ensure_root(&root).unwrap());
    }

    #[test]
    fn test_serialized_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::new(
            JsonCodec,
            LockRegistry::new(),
            ReadConsistency::Serialized,
        );
        let path = dir.path().join("fish").join("onefish");

        let fish = Fish {
            kind: "one".to_string(),
        };
        engine.write(&path, &fish).unwrap();
        let loaded: Fish = engine.read(&path).unwrap();
        assert_eq!(loaded, fish);
    }

    #[test]
    fn test_sweep_removes_orphaned_temp_files() {
        let dir = TempDir::new().unwrap();
        let engine = json_engine();
        let path = dir.path().join("fish").join("onefish");

        engine
            .write(
                &path,
                &Fish {
                    kind: "one".to_string(),
                },
            )
            .unwrap();

        // Plant orphans at two depths, plus a decoy that must survive
        fs::write(path.join("doc.json.tmp"), b"orphan").unwrap();
        fs::write(dir.path().join("doc.json.tmp"), b"orphan").unwrap();
        fs::write(path.join("notes.tmp"), b"keep").unwrap();

        let removed = engine.sweep_temp_files(dir.path()).unwrap();
        assert_eq!(removed, 2);
        assert!(!path.join("doc.json.tmp").exists());
        assert!(path.join("notes.tmp").exists());

        // Swept documents still read back
        let loaded: Fish = engine.read(&path).unwrap();
        assert_eq!(loaded.kind, "one");
    }
}
