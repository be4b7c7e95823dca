use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Data source path is empty")]
    EmptyPath,

    #[error("Path does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Invalid path '{path}': must stay inside the data source")]
    InvalidPath { path: String },

    #[error("Unsupported data source type '{kind}'")]
    UnsupportedType { kind: String },

    #[error("Data source '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("Unknown data source '{name}'")]
    Unknown { name: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data source registry {path}: {reason}")]
    Store { path: PathBuf, reason: String },
}

impl DataSourceError {
    /// Map an I/O error on `path`, keeping not-found distinct.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DataSourceError::NotFound { path }
        } else {
            DataSourceError::Io { path, source }
        }
    }

    /// Whether the caller supplied bad input, as opposed to a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DataSourceError::EmptyPath
                | DataSourceError::NotFound { .. }
                | DataSourceError::NotADirectory { .. }
                | DataSourceError::InvalidPath { .. }
                | DataSourceError::UnsupportedType { .. }
                | DataSourceError::AlreadyExists { .. }
                | DataSourceError::Unknown { .. }
        )
    }
}

pub type DataSourceResult<T> = Result<T, DataSourceError>;
