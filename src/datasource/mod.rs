//! Data sources: named roots of LaTeX documents.
//!
//! A data source is reached only through the [`DataSource`] capability
//! trait. The local directory source is the one implementation; the
//! registry persists name -> record so sources survive restarts.

mod error;
mod local;
pub mod store;
mod tree;

pub use error::{DataSourceError, DataSourceResult};
pub use local::LocalDataSource;
pub use store::{DataSourceRecord, DataSourceStore, DataSources};
pub use tree::{FileNode, build_tree};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::watcher::ExtensionFilter;

/// Supported data source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Local,
}

impl DataSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::Local => "local",
        }
    }

    /// Validate `path` and build a fresh source of this kind. `filter`
    /// decides which files the source lists.
    pub fn create(
        &self,
        id: u32,
        path: &Path,
        filter: &ExtensionFilter,
    ) -> DataSourceResult<Box<dyn DataSource>> {
        match self {
            DataSourceKind::Local => Ok(Box::new(
                LocalDataSource::new(id, path)?.with_filter(filter.clone()),
            )),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DataSourceKind {
    type Err = DataSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(DataSourceKind::Local),
            other => Err(DataSourceError::UnsupportedType {
                kind: other.to_string(),
            }),
        }
    }
}

/// Capability interface every data source provides.
pub trait DataSource: Send + Sync {
    fn connect(&self) -> DataSourceResult<()>;

    fn disconnect(&self) -> DataSourceResult<()>;

    fn kind(&self) -> DataSourceKind;

    /// Directory the watcher observes.
    fn root(&self) -> &Path;

    fn id(&self) -> u32;

    /// Kind-specific details shown in listings.
    fn metadata(&self) -> Map<String, Value>;

    /// Tree of tracked documents under a path relative to the root. An
    /// empty path lists the root.
    fn list_files(&self, sub_path: &str) -> DataSourceResult<FileNode>;

    /// Raw bytes of a file relative to the root.
    fn read_file(&self, path: &str) -> DataSourceResult<Vec<u8>>;

    /// Metadata merged with `type` and `id`, as listed over the API.
    fn describe(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("type".to_string(), Value::from(self.kind().as_str()));
        meta.insert("id".to_string(), Value::from(self.id()));
        meta.extend(self.metadata());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("local".parse::<DataSourceKind>().unwrap(), DataSourceKind::Local);
        assert!(matches!(
            "s3".parse::<DataSourceKind>(),
            Err(DataSourceError::UnsupportedType { kind }) if kind == "s3"
        ));
    }

    #[test]
    fn test_describe_merges_identity() {
        let dir = TempDir::new().unwrap();
        let source = DataSourceKind::Local
            .create(3, dir.path(), &ExtensionFilter::default())
            .unwrap();
        let meta = source.describe();

        assert_eq!(meta["type"], "local");
        assert_eq!(meta["id"], 3);
        assert!(meta.contains_key("path"));
    }

    #[test]
    fn test_create_applies_filter() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.tex"), "x").unwrap();
        std::fs::write(dir.path().join("appendix.ltx"), "x").unwrap();

        let tex_only = DataSourceKind::Local
            .create(1, dir.path(), &ExtensionFilter::default())
            .unwrap();
        assert_eq!(tex_only.list_files("").unwrap().file_count(), 1);

        let both = DataSourceKind::Local
            .create(2, dir.path(), &ExtensionFilter::new(["tex", "ltx"]))
            .unwrap();
        assert_eq!(both.list_files("").unwrap().file_count(), 2);
    }
}
