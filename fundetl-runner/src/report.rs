//! Summary of one pipeline run.

use chrono::{DateTime, Utc};
use fundetl_core::SaveMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineReport {
    pub statement: String,
    pub symbols: Vec<String>,
    pub raw_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub save_mode: SaveMode,
    /// Rows in the cleaned table.
    pub rows: usize,
    pub columns: Vec<String>,
    /// BLAKE3 of the cleaned artifact, hashed before cleanup.
    pub cleaned_blake3: String,
    /// `s3://` addresses written, empty when uploads are disabled.
    pub remote_uris: Vec<String>,
    /// Local files removed by cleanup.
    pub removed: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Hex BLAKE3 digest of a file's contents.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
