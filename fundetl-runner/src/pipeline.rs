//! Pipeline driver: extract → transform → load → cleanup.
//!
//! Steps run strictly in order with no recovery; the first failure aborts
//! the run and is reported with the step it came from.

use crate::config::{ConfigError, PipelineConfig};
use crate::report::{hash_file, PipelineReport};
use chrono::Utc;
use fundetl_core::etl::table::column_names;
use fundetl_core::{Credentials, EtlBase, EtlError, IncomeStatementEtl, StatementEtl};
use polars::prelude::DataFrame;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Pipeline stage, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Extract,
    Transform,
    Load,
    Cleanup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Extract => "extract",
            Step::Transform => "transform",
            Step::Load => "load",
            Step::Cleanup => "cleanup",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{step} step failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: EtlError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Step that failed, if the error came from one.
    pub fn step(&self) -> Option<Step> {
        match self {
            PipelineError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn at(step: Step) -> impl FnOnce(EtlError) -> PipelineError {
    move |source| PipelineError::Step { step, source }
}

/// One configured run of a statement ETL.
pub struct Pipeline {
    config: PipelineConfig,
    etl: Box<dyn StatementEtl>,
    raw_path: PathBuf,
    cleaned_path: PathBuf,
}

impl Pipeline {
    /// Wrap an already-built ETL. Creates `data_dir`.
    pub fn new(config: PipelineConfig, etl: Box<dyn StatementEtl>) -> Result<Self, PipelineError> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir).map_err(|source| PipelineError::Io {
            path: config.data_dir.clone(),
            source,
        })?;

        let schema = etl.schema();
        let raw_path = config.raw_path(&schema.raw_file_name());
        let cleaned_path = config.cleaned_path(schema.name);
        Ok(Self {
            config,
            etl,
            raw_path,
            cleaned_path,
        })
    }

    /// Build the income statement pipeline: Yahoo provider, configured store.
    pub fn from_config(
        config: PipelineConfig,
        credentials: Credentials,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let provider = config.provider.build()?;

        let mut base =
            EtlBase::new(config.data_lake_dir.clone()).with_bucket(config.storage.bucket.clone());
        if let Some(store) = config.storage.build(config.timeout())? {
            base = base.with_store(store);
        }

        let etl = IncomeStatementEtl::new(base, Box::new(provider), credentials)
            .with_window(config.window);
        Self::new(config, Box::new(etl))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn cleaned_path(&self) -> &Path {
        &self.cleaned_path
    }

    pub fn extract_data(&self) -> Result<PathBuf, PipelineError> {
        info!(step = %Step::Extract, symbols = self.config.symbols.len(), "starting step");
        self.etl
            .extract(&self.config.symbols, Some(&self.raw_path))
            .map_err(at(Step::Extract))
    }

    pub fn transform_data(&self) -> Result<DataFrame, PipelineError> {
        info!(step = %Step::Transform, mode = %self.config.save_mode, "starting step");
        self.etl
            .transform(&self.raw_path, &self.cleaned_path, self.config.save_mode)
            .map_err(at(Step::Transform))
    }

    pub fn load_data(&self) -> Result<(), PipelineError> {
        info!(step = %Step::Load, "starting step");
        self.etl.load().map_err(at(Step::Load))
    }

    /// Cleanup step. Removes the raw extract and cleaned artifact once they
    /// have been uploaded; without an object store, or with `keep_outputs`,
    /// they stay on disk. Returns the files removed.
    pub fn clean_scratch(&self) -> Result<Vec<PathBuf>, PipelineError> {
        if self.config.keep_outputs {
            info!(step = %Step::Cleanup, "keep_outputs set, leaving local files");
            return Ok(Vec::new());
        }
        if !self.etl.base().has_store() {
            info!(
                step = %Step::Cleanup,
                cleaned = %self.cleaned_path.display(),
                "no object store configured, leaving local files"
            );
            return Ok(Vec::new());
        }
        info!(step = %Step::Cleanup, "starting step");
        self.remove_local_files()
    }

    /// Remove the raw extract and cleaned artifact unconditionally. Returns
    /// the files that existed and were removed.
    pub fn remove_local_files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let present: Vec<PathBuf> = [&self.raw_path, &self.cleaned_path]
            .into_iter()
            .filter(|p| p.exists())
            .cloned()
            .collect();
        self.etl
            .remove_files(&present)
            .map_err(at(Step::Cleanup))?;
        Ok(present)
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let schema = self.etl.schema();
        info!(
            statement = schema.name,
            symbols = %self.config.symbols.join(","),
            "pipeline starting"
        );

        let (cleaned, cleaned_blake3, removed) = self.run_steps().map_err(|e| {
            warn!(error = %e, step = ?e.step(), "pipeline aborted");
            e
        })?;

        let base = self.etl.base();
        let remote_uris = if base.has_store() {
            vec![
                base.object_uri(&schema.staging_key()).to_string(),
                base.object_uri(&schema.warehouse_key(self.config.save_mode))
                    .to_string(),
            ]
        } else {
            Vec::new()
        };

        let report = PipelineReport {
            statement: schema.name.to_string(),
            symbols: self.config.symbols.clone(),
            raw_path: self.raw_path.clone(),
            cleaned_path: self.cleaned_path.clone(),
            save_mode: self.config.save_mode,
            rows: cleaned.height(),
            columns: column_names(&cleaned),
            cleaned_blake3,
            remote_uris,
            removed,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            rows = report.rows,
            elapsed_ms = report.elapsed_ms(),
            hash = %report.cleaned_blake3,
            "pipeline finished"
        );
        Ok(report)
    }

    fn run_steps(&self) -> Result<(DataFrame, String, Vec<PathBuf>), PipelineError> {
        self.extract_data()?;
        let cleaned = self.transform_data()?;
        let hash = hash_file(&self.cleaned_path).map_err(|source| PipelineError::Io {
            path: self.cleaned_path.clone(),
            source,
        })?;
        self.load_data()?;
        let removed = self.clean_scratch()?;
        Ok((cleaned, hash, removed))
    }
}
