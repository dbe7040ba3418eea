//! JSON array file persistence.
//!
//! A [`RecordStore`] reads a whole file into an ordered `Vec` of records and
//! writes the whole `Vec` back. Writes go to a `.tmp` sibling first and are
//! renamed over the target, so readers never observe a half-written file.
//!
//! Field names on disk are camelCase; each record type maps them to its
//! snake_case fields through serde. Output is pretty-printed with two-space
//! indentation and non-ASCII text is written literally.
//!
//! There is no locking. Two processes writing the same file race and the
//! last rename wins.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// A persisted entity with a stable identity.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Entity name used in log lines.
    const KIND: &'static str;

    /// Identity of the record within its collection.
    fn key(&self) -> &str;
}

/// Whole-file store for one collection.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RecordStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record, preserving file order.
    pub fn load(&self) -> Result<Vec<T>, StoreError> {
        let data =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let records: Vec<T> =
            serde_json::from_str(&data).map_err(|e| StoreError::json(&self.path, e))?;
        tracing::debug!(
            kind = T::KIND,
            count = records.len(),
            "loaded {}",
            self.path.display()
        );
        Ok(records)
    }

    /// Replace the file contents with `records`.
    pub fn save(&self, records: &[T]) -> Result<(), StoreError> {
        let json =
            serde_json::to_string_pretty(records).map_err(|e| StoreError::json(&self.path, e))?;
        atomic_write(&self.path, json.as_bytes())?;
        tracing::debug!(
            kind = T::KIND,
            count = records.len(),
            "saved {}",
            self.path.display()
        );
        Ok(())
    }

    /// Create the parent directory and an empty collection if the file is absent.
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        tracing::info!(kind = T::KIND, "initializing empty {}", self.path.display());
        self.save(&[])
    }
}

/// Atomically write `data` to `path` via a `.tmp` sibling.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
