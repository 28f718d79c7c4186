//! Path construction for the collection/document namespace
//!
//! Collections and documents map directly onto directories: a collection is
//! `parent/name`, a document is `parent/key`. Names and keys must be
//! non-empty; nothing beyond lexical cleaning is applied to the database
//! root, so this is a namespace, not a sandbox.

use std::path::{Component, Path, PathBuf};

use super::error::{StoreError, StoreResult};

/// Lexically clean a path without touching the filesystem
///
/// Drops `.` components and resolves `..` against the components already
/// seen (leading `..` on a relative path is kept). An empty input becomes
/// `.` so the result is always usable as a directory path.
pub(crate) fn clean(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                // `/..` stays `/`
                Some(Component::RootDir) => {}
                _ => result.push(Component::ParentDir),
            },
            _ => result.push(component),
        }
    }
    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// Resolve the path of a collection under `base`
pub(crate) fn resolve_collection(base: &Path, name: &str) -> StoreResult<PathBuf> {
    if name.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(base.join(name))
}

/// Resolve the path of a document under `base`
pub(crate) fn resolve_document(base: &Path, key: &str) -> StoreResult<PathBuf> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(base.join(key))
}
