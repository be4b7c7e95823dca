//! Data source backed by a local directory.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};

use super::error::{DataSourceError, DataSourceResult};
use super::tree::{FileNode, build_root};
use super::{DataSource, DataSourceKind};
use crate::watcher::ExtensionFilter;

#[derive(Debug, Clone)]
pub struct LocalDataSource {
    id: u32,
    root: PathBuf,
    filter: ExtensionFilter,
}

impl LocalDataSource {
    /// Validate `root` and create a source for it. The root is stored in
    /// canonical form so fingerprints match what the watcher sees.
    pub fn new(id: u32, root: impl AsRef<Path>) -> DataSourceResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(DataSourceError::EmptyPath);
        }
        let meta = std::fs::metadata(root).map_err(|e| DataSourceError::io(root, e))?;
        if !meta.is_dir() {
            return Err(DataSourceError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let root = root
            .canonicalize()
            .map_err(|e| DataSourceError::io(root, e))?;
        Ok(Self::open(id, root))
    }

    /// Reopen a previously validated source without touching the disk.
    pub fn open(id: u32, root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            root: root.into(),
            filter: ExtensionFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: ExtensionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Join a client-supplied relative path onto the root. Absolute paths
    /// and `..` segments are rejected.
    fn resolve(&self, relative: &str) -> DataSourceResult<PathBuf> {
        let relative = Path::new(relative);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DataSourceError::InvalidPath {
                        path: relative.to_string_lossy().into_owned(),
                    });
                }
            }
        }
        Ok(resolved)
    }
}

impl DataSource for LocalDataSource {
    fn connect(&self) -> DataSourceResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(DataSourceError::NotFound {
                path: self.root.clone(),
            })
        }
    }

    fn disconnect(&self) -> DataSourceResult<()> {
        Ok(())
    }

    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Local
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert(
            "path".to_string(),
            Value::String(self.root.to_string_lossy().into_owned()),
        );
        meta
    }

    fn list_files(&self, sub_path: &str) -> DataSourceResult<FileNode> {
        let path = self.resolve(sub_path)?;
        build_root(&path, &self.filter).map_err(|e| DataSourceError::io(&path, e))
    }

    fn read_file(&self, path: &str) -> DataSourceResult<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| DataSourceError::io(&full, e))
    }
}
