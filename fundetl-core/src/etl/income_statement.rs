//! Quarterly income statement ETL.

use super::schema::{StatementSchema, INCOME_STATEMENT};
use super::table::{self, SaveMode, DATE_RENAME};
use super::window::DateWindow;
use super::{ensure_parent, EtlBase, EtlError, StatementEtl};
use crate::data::provider::{Credentials, Frequency, StatementProvider, StatementRequest};
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Income statement ETL: Yahoo quarterly fundamentals, non-trailing.
pub struct IncomeStatementEtl {
    base: EtlBase,
    provider: Box<dyn StatementProvider>,
    credentials: Credentials,
    window: DateWindow,
}

impl IncomeStatementEtl {
    pub fn new(
        base: EtlBase,
        provider: Box<dyn StatementProvider>,
        credentials: Credentials,
    ) -> Self {
        Self {
            base,
            provider,
            credentials,
            window: DateWindow::default(),
        }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// `<data_lake_dir>/income_statement.csv`
    pub fn default_raw_path(&self) -> PathBuf {
        self.base.data_lake_dir().join(INCOME_STATEMENT.raw_file_name())
    }

    fn request() -> StatementRequest<'static> {
        StatementRequest {
            line_items: INCOME_STATEMENT.line_items,
            frequency: Frequency::Quarterly,
            trailing: false,
        }
    }
}

/// First occurrence of each symbol, in input order.
fn unique_symbols(symbols: &[String]) -> Vec<&str> {
    let mut seen = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if !seen.contains(&symbol.as_str()) {
            seen.push(symbol.as_str());
        }
    }
    seen
}

impl StatementEtl for IncomeStatementEtl {
    fn schema(&self) -> &StatementSchema {
        &INCOME_STATEMENT
    }

    fn base(&self) -> &EtlBase {
        &self.base
    }

    fn extract(&self, symbols: &[String], output: Option<&Path>) -> Result<PathBuf, EtlError> {
        if symbols.is_empty() {
            return Err(EtlError::InvalidInput("no symbols to extract".into()));
        }
        let symbols = unique_symbols(symbols);

        info!(
            provider = self.provider.name(),
            symbols = %symbols.join(","),
            "extracting income statement"
        );
        let fetched = self
            .provider
            .fetch_statement(&symbols, &Self::request(), &self.credentials)?;

        let path = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let dir = self.base.data_lake_dir();
                fs::create_dir_all(dir).map_err(EtlError::io(dir))?;
                self.default_raw_path()
            }
        };
        ensure_parent(&path)?;

        let mut df = table::rows_to_dataframe(&fetched)?;
        table::write_csv(&mut df, &path)?;
        info!(path = %path.display(), rows = df.height(), columns = df.width(), "wrote raw extract");

        let staging = self.base.object_uri(&INCOME_STATEMENT.staging_key());
        self.base.save_to_remote(&path, &staging)?;
        Ok(path)
    }

    fn transform(
        &self,
        input: &Path,
        output: &Path,
        mode: SaveMode,
    ) -> Result<DataFrame, EtlError> {
        let mut raw = table::read_csv(input)?;
        let raw_rows = raw.height();

        table::rename_columns(&mut raw, DATE_RENAME)?;
        let in_window = table::filter_by_date_window(&raw, &self.window)?;
        INCOME_STATEMENT.validate(&in_window)?;
        let mut cleaned = table::project(&in_window, INCOME_STATEMENT.columns)?;

        table::write_table(&mut cleaned, output, mode)?;
        info!(
            path = %output.display(),
            %mode,
            raw_rows,
            rows = cleaned.height(),
            start = %self.window.start,
            end = %self.window.end,
            "wrote cleaned income statement"
        );

        let warehouse = self.base.object_uri(&INCOME_STATEMENT.warehouse_key(mode));
        self.base.save_to_remote(output, &warehouse)?;
        Ok(cleaned)
    }

    fn load(&self) -> Result<(), EtlError> {
        info!(
            bucket = self.base.bucket(),
            uploaded = self.base.has_store(),
            "load: cleaned artifact was handed off during transform"
        );
        Ok(())
    }

    fn remove_files(&self, paths: &[PathBuf]) -> Result<(), EtlError> {
        self.base.remove_files(paths)
    }
}
