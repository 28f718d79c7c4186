//! Database entry point
//!
//! A [`Database`] is the root document of a tree of collections and
//! documents. Opening it cleans the configured data directory path, creates
//! the root directory and its marker content file on first use, and wires
//! up the codec and the per-path lock registry shared by every handle.
//!
//! ## Usage
//!
//! ```text
//! let db = Database::open_with_config(config)?;
//!
//! db.collection("fish").document("redfish").write(&fish)?;
//! let fish: Fish = db.collection("fish").document("redfish").read()?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec};
use crate::collection::Collection;
use crate::config::Config;
use crate::document::Document;
use crate::storage::{clean, LockRegistry, StorageEngine, StoreResult};

/// State shared by the database and every handle chained off it
#[derive(Debug)]
pub(crate) struct Shared<C> {
    pub(crate) root: PathBuf,
    pub(crate) engine: StorageEngine<C>,
}

/// A hierarchical document store rooted at a directory
///
/// Cloning is cheap; clones share the same root, codec, and lock registry.
pub struct Database<C: Codec = JsonCodec> {
    shared: Arc<Shared<C>>,
}

impl Database<JsonCodec> {
    /// Open the database described by the default configuration
    /// (config file plus environment overrides), using the JSON codec
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open a JSON-codec database with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        Self::open_with(config, JsonCodec, LockRegistry::new())
    }
}

impl<C: Codec> Database<C> {
    /// Open a database with an explicit codec and lock registry
    ///
    /// Passing the registry makes it shareable and inspectable; most callers
    /// want `open_with_config` instead.
    pub fn open_with(config: Config, codec: C, locks: LockRegistry) -> Result<Self> {
        let root = clean(&config.data_dir);
        let engine = StorageEngine::new(codec, locks, config.read_consistency);

        let created = engine
            .ensure_root(&root)
            .with_context(|| format!("Failed to initialize database root at {:?}", root))?;
        if created {
            debug!(root = %root.display(), "created new database");
        }

        if config.sweep_on_open {
            let removed = engine
                .sweep_temp_files(&root)
                .context("Failed to sweep orphaned temp files")?;
            if removed > 0 {
                warn!(removed, "swept orphaned temp files at open");
            }
        }

        Ok(Self {
            shared: Arc::new(Shared { root, engine }),
        })
    }

    /// The cleaned root directory of the database
    pub fn path(&self) -> &Path {
        &self.shared.root
    }

    /// The root document, parent of every top-level collection
    pub fn root(&self) -> Document<C> {
        Document::new(Arc::clone(&self.shared), self.shared.root.clone(), None)
    }

    /// A top-level collection by name
    pub fn collection(&self, name: &str) -> Collection<C> {
        self.root().collection(name)
    }

    /// Remove orphaned `.tmp` artifacts left behind by a crash mid-write
    ///
    /// Returns the number of files removed. Safe to run while the database
    /// is in use only if no writer is mid-flight; intended as a maintenance
    /// step at startup (see `Config::sweep_on_open`).
    pub fn sweep_temp_files(&self) -> StoreResult<usize> {
        self.shared.engine.sweep_temp_files(&self.shared.root)
    }
}

impl<C: Codec> Clone for Database<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
