//! On-disk layout of the store files.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use offmap_types::MapId;

use crate::error::{Result, StoreError};
use crate::store::{ResourceStore, StoreIdentity};

/// File extension of store files.
pub const STORE_EXTENSION: &str = "db";

/// Side files SQLite keeps next to a store in WAL mode.
const SIDE_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Directory holding one store file per map.
///
/// Stores live at `<root>/<map file stem>.db`.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    root: PathBuf,
}

impl StoreDirectory {
    /// Opens the directory at `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| StoreError::CreateDir {
                path: root.clone(),
                source: e,
            })?;
        }
        Ok(Self { root })
    }

    /// Returns the default data directory for offmap.
    ///
    /// Uses the platform data directory from the `directories` crate
    /// (e.g. `~/.local/share/offmap/` on Linux) and falls back to
    /// `~/.offmap/` when it cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "offmap").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Opens the directory at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the store file path for `map_id`.
    #[must_use]
    pub fn store_path(&self, map_id: &MapId) -> PathBuf {
        self.root
            .join(format!("{}.{STORE_EXTENSION}", map_id.file_stem()))
    }

    /// Creates a new store for `identity`, replacing any inert file left at
    /// its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the stale file cannot be removed or the new store
    /// fails to initialize.
    pub fn create_store(&self, identity: &StoreIdentity) -> Result<ResourceStore> {
        let path = self.store_path(&identity.map_id);
        if path.exists() {
            tracing::debug!(path = %path.display(), "replacing uninitialized store file");
            remove_store_files(&path)?;
        }
        ResourceStore::create(path, identity)
    }

    /// Scans the directory for initialized stores.
    ///
    /// Files that fail to open or initialize are skipped. Every returned
    /// store has its connection closed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn discover(&self) -> Result<Vec<ResourceStore>> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::ReadDir {
            path: self.root.clone(),
            source: e,
        })?;

        let mut stores = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::ReadDir {
                path: self.root.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != STORE_EXTENSION) {
                continue;
            }

            let store = ResourceStore::open(&path);
            match store.initialize() {
                Ok(true) => {
                    store.close();
                    stores.push(store);
                }
                Ok(false) => {
                    tracing::warn!(path = %path.display(), "skipping store with incomplete metadata");
                    store.close();
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable store");
                }
            }
        }

        stores.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(stores)
    }
}

/// Deletes a store file and its SQLite side files. Missing files are ignored.
///
/// # Errors
///
/// Returns an error if an existing file cannot be deleted.
pub fn remove_store_files(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_path_buf()];
    targets.extend(SIDE_SUFFIXES.iter().map(|suffix| {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        PathBuf::from(side)
    }));

    for target in targets {
        match fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::DeleteFile {
                    path: target,
                    source: e,
                });
            }
        }
    }
    Ok(())
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".offmap")
}
