//! Object storage: addresses, the upload trait and its backends.
//!
//! The pipeline only ever writes objects, so the trait has a single `put`.

pub mod local;
pub mod s3;
pub mod sigv4;

pub use local::LocalStore;
pub use s3::{AwsCredentials, S3Store};

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "s3://";

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local file not found: {}", .0.display())]
    LocalFileMissing(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object URI '{0}' (expected s3://bucket/key)")]
    InvalidUri(String),

    #[error("storage credentials missing: {0}")]
    MissingCredentials(String),

    #[error("upload to {uri} rejected with HTTP {status}: {body}")]
    Rejected {
        uri: ObjectUri,
        status: u16,
        body: String,
    },

    #[error("upload to {uri} failed: {reason}")]
    Transport { uri: ObjectUri, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUri {
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidUri(s.to_string());
        let rest = s.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(bucket, key))
    }
}

/// Write-only object store.
pub trait ObjectStore: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Upload `local` to `uri`, overwriting any existing object.
    fn put(&self, local: &Path, uri: &ObjectUri) -> Result<(), StoreError>;
}

/// Read a file to upload, mapping absence to `LocalFileMissing`.
pub(crate) fn read_local(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => StoreError::LocalFileMissing(path.to_path_buf()),
        _ => StoreError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}
