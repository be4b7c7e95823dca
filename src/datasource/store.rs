//! Persistent registry of configured data sources.
//!
//! The whole registry is one JSON document, rewritten atomically on every
//! change: serialized to a temp file in the same directory, then renamed
//! over the old file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::error::{DataSourceError, DataSourceResult};
use super::local::LocalDataSource;
use super::{DataSource, DataSourceKind};
use crate::watcher::ExtensionFilter;

/// What is persisted for one data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRecord {
    #[serde(rename = "type")]
    pub kind: DataSourceKind,
    pub id: u32,
    pub path: PathBuf,
}

impl DataSourceRecord {
    /// Instantiate the data source this record describes, listing only
    /// files accepted by `filter`.
    pub fn open(&self, filter: &ExtensionFilter) -> Box<dyn DataSource> {
        match self.kind {
            DataSourceKind::Local => Box::new(
                LocalDataSource::open(self.id, &self.path).with_filter(filter.clone()),
            ),
        }
    }
}

/// Name -> record map, ordered for stable listings.
pub type DataSources = BTreeMap<String, DataSourceRecord>;

#[derive(Debug)]
pub struct DataSourceStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl DataSourceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing file is an empty registry.
    pub fn get(&self) -> DataSourceResult<DataSources> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DataSources::new()),
            Err(e) => return Err(self.error(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(DataSources::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| self.error(e))
    }

    /// Replace the stored registry.
    pub fn save(&self, sources: &DataSources) -> DataSourceResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.error(e))?;

        let mut file = NamedTempFile::new_in(&dir).map_err(|e| self.error(e))?;
        serde_json::to_writer_pretty(&mut file, sources).map_err(|e| self.error(e))?;
        file.write_all(b"\n").map_err(|e| self.error(e))?;
        file.as_file().sync_all().map_err(|e| self.error(e))?;
        file.persist(&self.path).map_err(|e| self.error(e.error))?;
        Ok(())
    }

    /// Add a record under a new name.
    pub fn insert(&self, name: &str, record: DataSourceRecord) -> DataSourceResult<()> {
        let _guard = self.write_lock.lock();
        let mut sources = self.get()?;
        if sources.contains_key(name) {
            return Err(DataSourceError::AlreadyExists {
                name: name.to_string(),
            });
        }
        sources.insert(name.to_string(), record);
        self.save(&sources)
    }

    pub fn find(&self, name: &str) -> DataSourceResult<DataSourceRecord> {
        self.get()?
            .remove(name)
            .ok_or_else(|| DataSourceError::Unknown {
                name: name.to_string(),
            })
    }

    fn error(&self, reason: impl std::fmt::Display) -> DataSourceError {
        DataSourceError::Store {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
