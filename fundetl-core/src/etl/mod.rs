//! The statement ETL contract and its shared state.
//!
//! Every statement kind implements [`StatementEtl`]. Shared configuration
//! (scratch directory, object store, bucket) lives in [`EtlBase`], which
//! concrete ETLs embed.

pub mod income_statement;
pub mod schema;
pub mod table;
pub mod window;

pub use income_statement::IncomeStatementEtl;
pub use schema::StatementSchema;
pub use table::SaveMode;
pub use window::DateWindow;

use crate::data::provider::DataError;
use crate::storage::{ObjectStore, ObjectUri, StoreError};
use polars::prelude::{DataFrame, PolarsError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default bucket for staging and warehouse objects.
pub const DEFAULT_BUCKET: &str = "lg18dagbucket";
/// Default scratch directory for raw extracts.
pub const DEFAULT_DATA_LAKE_DIR: &str = "data_lake";

/// Errors from ETL operations.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("upstream: {0}")]
    Upstream(#[from] DataError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("schema mismatch: column '{column}' not found")]
    SchemaMismatch { column: String },

    #[error("unparseable date '{value}' at row {row}")]
    DateParse { row: usize, value: String },

    #[error("table operation failed: {0}")]
    Table(#[from] PolarsError),

    #[error("upload: {0}")]
    Upload(#[from] StoreError),
}

impl EtlError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> EtlError {
        let path = path.to_path_buf();
        move |source| EtlError::Io { path, source }
    }
}

/// Capability set of one financial-statement ETL.
pub trait StatementEtl {
    /// Schema (line items, whitelist, artifact names) of this statement.
    fn schema(&self) -> &StatementSchema;

    /// Shared scratch/storage state.
    fn base(&self) -> &EtlBase;

    /// Fetch raw rows for `symbols` and write them as CSV.
    ///
    /// Without `output`, writes `<data_lake_dir>/<statement>.csv`. Returns
    /// the path written.
    fn extract(&self, symbols: &[String], output: Option<&Path>) -> Result<PathBuf, EtlError>;

    /// Rename, date-filter and project a raw extract, write it in `mode`,
    /// and return the cleaned table.
    fn transform(&self, input: &Path, output: &Path, mode: SaveMode)
        -> Result<DataFrame, EtlError>;

    /// Hand off to the warehouse.
    fn load(&self) -> Result<(), EtlError>;

    /// Delete local scratch files. Missing files are not an error.
    fn remove_files(&self, paths: &[PathBuf]) -> Result<(), EtlError>;
}

/// State shared by every statement ETL.
pub struct EtlBase {
    data_lake_dir: PathBuf,
    bucket: String,
    store: Option<Box<dyn ObjectStore>>,
}

impl EtlBase {
    pub fn new(data_lake_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_lake_dir: data_lake_dir.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            store: None,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn data_lake_dir(&self) -> &Path {
        &self.data_lake_dir
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Address of `key` in the configured bucket.
    pub fn object_uri(&self, key: &str) -> ObjectUri {
        ObjectUri::new(&self.bucket, key)
    }

    /// Upload `local` to `remote`. Without a store the upload is skipped and
    /// `Ok(false)` returned; the local file must exist either way.
    pub fn save_to_remote(&self, local: &Path, remote: &ObjectUri) -> Result<bool, EtlError> {
        if !local.is_file() {
            return Err(EtlError::NotFound(local.to_path_buf()));
        }
        match &self.store {
            Some(store) => {
                store.put(local, remote)?;
                info!(local = %local.display(), %remote, store = store.name(), "saved to remote");
                Ok(true)
            }
            None => {
                debug!(local = %local.display(), %remote, "no object store configured, skipping upload");
                Ok(false)
            }
        }
    }

    /// Best-effort delete of scratch files.
    pub fn remove_files(&self, paths: &[PathBuf]) -> Result<(), EtlError> {
        for path in paths {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "removed scratch file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "scratch file already gone")
                }
                Err(e) => return Err(EtlError::io(path)(e)),
            }
        }
        Ok(())
    }
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), EtlError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(EtlError::io(parent))
        }
        _ => Ok(()),
    }
}
