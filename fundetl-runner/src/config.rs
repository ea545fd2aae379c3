//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default equal to the stock driver run, so an empty file
//! (or no file at all) gives the five-bank income statement pipeline writing
//! CSV under `data/`. Secrets never live here: provider and AWS credentials
//! come from the environment.

use fundetl_core::etl::{DEFAULT_BUCKET, DEFAULT_DATA_LAKE_DIR};
use fundetl_core::storage::s3::{region_from_env, AwsCredentials};
use fundetl_core::{
    DataError, DateWindow, LocalStore, ObjectStore, S3Store, SaveMode, StoreError,
    YahooFundamentalsProvider,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SYMBOLS: &[&str] = &["JPM", "GS", "MS", "BA", "SIVBQ"];
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("provider setup failed: {0}")]
    Provider(#[from] DataError),
    #[error("storage setup failed: {0}")]
    Storage(#[from] StoreError),
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tickers to extract, in output order.
    pub symbols: Vec<String>,

    /// Directory for raw extracts.
    pub data_lake_dir: PathBuf,

    /// Directory for cleaned output; created when the pipeline is built.
    pub data_dir: PathBuf,

    pub save_mode: SaveMode,

    /// Keep local artifacts instead of removing them in the cleanup step.
    pub keep_outputs: bool,

    pub window: DateWindow,
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            data_lake_dir: PathBuf::from(DEFAULT_DATA_LAKE_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            save_mode: SaveMode::Csv,
            keep_outputs: false,
            window: DateWindow::default(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        if let Some(bad) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank symbol {bad:?}")));
        }
        if self.window.start > self.window.end {
            return Err(ConfigError::Invalid(format!(
                "window start {} is after end {}",
                self.window.start, self.window.end
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".into()));
        }
        if self.storage.kind != StorageKind::None && self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.bucket must not be empty".into()));
        }
        Ok(())
    }

    /// Path the raw extract is written to.
    pub fn raw_path(&self, raw_file_name: &str) -> PathBuf {
        self.data_lake_dir.join(raw_file_name)
    }

    /// Path the cleaned artifact is written to, extension following the save mode.
    pub fn cleaned_path(&self, statement: &str) -> PathBuf {
        self.data_dir
            .join(format!("{statement}.{}", self.save_mode.extension()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: YahooFundamentalsProvider::DEFAULT_BASE_URL.to_string(),
            timeout_secs: YahooFundamentalsProvider::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn build(&self) -> Result<YahooFundamentalsProvider, ConfigError> {
        let provider = YahooFundamentalsProvider::new(
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
        )?;
        Ok(provider)
    }
}

/// Where uploads go.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Uploads are skipped.
    #[default]
    None,
    S3,
    /// Objects mirrored under a local directory.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub bucket: String,
    /// Falls back to `AWS_REGION`, then `us-east-1`.
    pub region: Option<String>,
    /// Custom S3-compatible endpoint; switches to path-style URLs.
    pub endpoint: Option<String>,
    /// Root directory for the local store.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::None,
            bucket: DEFAULT_BUCKET.to_string(),
            region: None,
            endpoint: None,
            root: PathBuf::from("object_store"),
        }
    }
}

impl StorageConfig {
    /// Build the configured store, reading AWS credentials from the environment for S3.
    pub fn build(&self, timeout: Duration) -> Result<Option<Box<dyn ObjectStore>>, ConfigError> {
        let store: Box<dyn ObjectStore> = match self.kind {
            StorageKind::None => return Ok(None),
            StorageKind::Local => Box::new(LocalStore::new(self.root.clone())),
            StorageKind::S3 => {
                let credentials = AwsCredentials::from_env()?;
                let region = self.region.clone().unwrap_or_else(region_from_env);
                Box::new(S3Store::new(
                    credentials,
                    region,
                    self.endpoint.clone(),
                    timeout,
                )?)
            }
        };
        Ok(Some(store))
    }
}
