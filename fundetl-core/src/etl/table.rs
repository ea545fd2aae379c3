//! Statement table helpers: build from provider rows, CSV/Parquet I/O, and
//! the rename / date-filter / projection steps of transform.

use super::window::{parse_timestamp, DateWindow};
use super::{ensure_parent, EtlError};
use crate::data::provider::FetchResult;
use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

pub const SYMBOL: &str = "symbol";
pub const AS_OF_DATE: &str = "asOfDate";
pub const DATE: &str = "date";
pub const PERIOD_TYPE: &str = "periodType";
pub const CURRENCY_CODE: &str = "currencyCode";

/// Provider date column to canonical name.
pub const DATE_RENAME: &[(&str, &str)] = &[(AS_OF_DATE, DATE)];

/// `num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Output format of the cleaned artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    Csv,
    #[default]
    Parquet,
}

impl SaveMode {
    pub fn extension(self) -> &'static str {
        match self {
            SaveMode::Csv => "csv",
            SaveMode::Parquet => "parquet",
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SaveMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(SaveMode::Csv),
            "parquet" => Ok(SaveMode::Parquet),
            other => Err(EtlError::InvalidInput(format!(
                "unknown save mode '{other}' (expected csv or parquet)"
            ))),
        }
    }
}

/// Raw table: `symbol, asOfDate, periodType, currencyCode`, then one column
/// per line item in name order.
pub fn rows_to_dataframe(result: &FetchResult) -> Result<DataFrame, EtlError> {
    let items: BTreeSet<&str> = result
        .line_items
        .iter()
        .map(String::as_str)
        .chain(result.rows.iter().flat_map(|r| r.values.keys().map(String::as_str)))
        .collect();

    let rows = &result.rows;
    let mut columns = vec![
        Column::new(
            SYMBOL.into(),
            rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            AS_OF_DATE.into(),
            rows.iter().map(|r| r.as_of_date.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            PERIOD_TYPE.into(),
            rows.iter().map(|r| r.period_type.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            CURRENCY_CODE.into(),
            rows.iter()
                .map(|r| r.currency_code.as_deref())
                .collect::<Vec<_>>(),
        ),
    ];

    for item in items {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.values.get(item).copied()).collect();
        columns.push(Column::new(item.into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Read a CSV with a header row, inferring types over the whole file.
pub fn read_csv(path: &Path) -> Result<DataFrame, EtlError> {
    if !path.is_file() {
        return Err(EtlError::NotFound(path.to_path_buf()));
    }
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| EtlError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write `df` as CSV with a header row and no index.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), EtlError> {
    ensure_parent(path)?;
    let mut file = File::create(path).map_err(EtlError::io(path))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Write `df` as a Parquet file.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), EtlError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(EtlError::io(path))?;
    ParquetWriter::new(file).finish(df)?;
    Ok(())
}

pub fn write_table(df: &mut DataFrame, path: &Path, mode: SaveMode) -> Result<(), EtlError> {
    match mode {
        SaveMode::Csv => write_csv(df, path),
        SaveMode::Parquet => write_parquet(df, path),
    }
}

/// Rename columns; mappings whose source column is absent are ignored.
pub fn rename_columns(df: &mut DataFrame, mapping: &[(&str, &str)]) -> Result<(), EtlError> {
    for (from, to) in mapping {
        if df.get_column_index(from).is_some() {
            df.rename(from, (*to).into())?;
        }
    }
    Ok(())
}

/// Keep rows whose `date` is a calendar day inside `window`, and replace the
/// column with a `Date`-typed one.
///
/// Null dates are dropped. A non-null value that is not a date or datetime
/// fails with `DateParse`.
pub fn filter_by_date_window(df: &DataFrame, window: &DateWindow) -> Result<DataFrame, EtlError> {
    let dates = df.column(DATE).map_err(|_| EtlError::SchemaMismatch {
        column: DATE.to_string(),
    })?;
    let as_text = dates.cast(&DataType::String)?;

    let mut keep = Vec::with_capacity(df.height());
    let mut kept_days = Vec::new();
    for (row, value) in as_text.str()?.into_iter().enumerate() {
        let day = match value {
            None => None,
            Some(text) => {
                let ts = parse_timestamp(text).ok_or_else(|| EtlError::DateParse {
                    row,
                    value: text.to_string(),
                })?;
                window.contains_day(ts).then(|| ts.date())
            }
        };
        keep.push(day.is_some());
        if let Some(day) = day {
            kept_days.push(day.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE);
        }
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let mut filtered = df.filter(&mask)?;
    let date_column = Column::new(DATE.into(), kept_days).cast(&DataType::Date)?;
    filtered.with_column(date_column)?;
    Ok(filtered)
}

/// Select `columns` in order. Callers check presence first with
/// [`StatementSchema::validate`](super::schema::StatementSchema::validate).
pub fn project(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, EtlError> {
    Ok(df.select(columns.iter().copied())?)
}

/// Column names of `df`, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}
