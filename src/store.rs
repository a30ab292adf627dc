//! Persistent key/value storage for accessibility preferences.
//!
//! The engine only ever talks to the [`Store`] trait. Two backends ship with
//! the crate: [`MemoryStore`] for tests and embedding, and [`JsonFileStore`],
//! a flat JSON object on disk that plays the role browser `localStorage`
//! plays for a web front-end.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Key holding `"true"` / `"false"` for the global accessibility switch.
pub const MODE_ENABLED_KEY: &str = "mode-enabled";
/// Key holding the selected simulation palette.
pub const SELECTED_PALETTE_KEY: &str = "selected-palette";
/// Key holding the compiled CSS filter string (possibly empty).
pub const APPLIED_FILTER_TRANSFORM_KEY: &str = "applied-filter-transform";
/// Key holding the active filter name; absent when no filter is active.
pub const ACTIVE_FILTER_NAME_KEY: &str = "active-filter-name";

/// Every key the engine writes, in a stable order.
pub const ALL_KEYS: [&str; 4] = [
    MODE_ENABLED_KEY,
    SELECTED_PALETTE_KEY,
    APPLIED_FILTER_TRANSFORM_KEY,
    ACTIVE_FILTER_NAME_KEY,
];

/// Keys written by earlier releases, consulted when the current key is missing.
pub(crate) fn legacy_key(key: &str) -> Option<&'static str> {
    match key {
        MODE_ENABLED_KEY => Some("colorblindModeEnabled"),
        SELECTED_PALETTE_KEY => Some("selectedPalette"),
        APPLIED_FILTER_TRANSFORM_KEY => Some("appliedFilter"),
        ACTIVE_FILTER_NAME_KEY => Some("activeFilterName"),
        _ => None,
    }
}

/// Error type for store operations.
///
/// Callers inside the crate treat every variant as "persistence unavailable"
/// and keep working in memory.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend refused the operation (quota, read-only medium, ...)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// IO error reading or writing the backing file
    #[error("storage IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Backing file exists but does not hold a JSON object of strings
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous, last-write-wins string key/value storage.
pub trait Store {
    /// Read a value. `Ok(None)` means the key was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-memory store. Survives nothing, but is handy for tests and for
/// embedding the engine where persistence is someone else's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// The file is read once when opened. Every write rewrites the whole file
/// through a sibling temp file and a rename, so a crash mid-write leaves the
/// previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    /// Memory holds changes the file doesn't; set when a flush fails.
    dirty: bool,
}

impl JsonFileStore {
    /// Open a store at `path`.
    ///
    /// A missing file is an empty store. A file that can't be read or parsed
    /// also opens as an empty store (with a warning); the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "starting with empty preference store");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), keys = entries.len(), "opened preference store");
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn sync(&mut self) -> Result<(), StoreError> {
        let result = self.flush();
        self.dirty = result.is_err();
        result
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if previous.as_deref() == Some(value) && !self.dirty {
            return Ok(());
        }
        self.sync()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_none() && !self.dirty {
            return Ok(());
        }
        self.sync()
    }
}
