use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for zipfs operations
pub type Result<T> = std::result::Result<T, ZipFsError>;

/// Unified error type for all zipfs operations
#[derive(Debug, Error)]
pub enum ZipFsError {
    // Construction errors
    #[error("Failed to initialize archive reader for {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: Box<ZipFsError>,
    },

    #[error("Failed to open archive handle for {identity}: {source}")]
    Open {
        identity: PathBuf,
        #[source]
        source: Box<ZipFsError>,
    },

    // Reader state
    #[error("Archive reader is closed")]
    Closed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ZipFsError {
    /// Wrap an error as a construction failure for `path`
    pub(crate) fn init(path: impl Into<PathBuf>, source: ZipFsError) -> Self {
        ZipFsError::Init {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error as a registry open failure for `identity`
    pub(crate) fn open(identity: impl Into<PathBuf>, source: ZipFsError) -> Self {
        ZipFsError::Open {
            identity: identity.into(),
            source: Box::new(source),
        }
    }

    /// True when the error reports use of a closed reader
    pub fn is_closed(&self) -> bool {
        matches!(self, ZipFsError::Closed)
    }
}

impl From<toml::de::Error> for ZipFsError {
    fn from(err: toml::de::Error) -> Self {
        ZipFsError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ZipFsError {
    fn from(err: toml::ser::Error) -> Self {
        ZipFsError::Config(err.to_string())
    }
}

impl From<ZipFsError> for io::Error {
    fn from(err: ZipFsError) -> io::Error {
        match err {
            ZipFsError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
