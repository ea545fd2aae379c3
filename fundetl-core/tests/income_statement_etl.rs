//! Integration tests for the income statement ETL.
//!
//! Extract runs against an in-process provider; transform runs against raw
//! CSV files laid out the way extract writes them.

use fundetl_core::data::provider::{
    Credentials, DataError, FetchResult, StatementProvider, StatementRequest, StatementRow,
};
use fundetl_core::etl::schema::INCOME_STATEMENT;
use fundetl_core::etl::table::column_names;
use fundetl_core::{
    DateWindow, EtlBase, EtlError, IncomeStatementEtl, LocalStore, SaveMode, StatementEtl,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serves a fixed set of rows, filtered to the requested symbols.
struct FixtureProvider {
    rows: Vec<StatementRow>,
}

impl StatementProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch_statement(
        &self,
        symbols: &[&str],
        request: &StatementRequest<'_>,
        credentials: &Credentials,
    ) -> Result<FetchResult, DataError> {
        credentials.require()?;
        let rows = symbols
            .iter()
            .flat_map(|s| self.rows.iter().filter(move |r| r.symbol == *s).cloned())
            .collect();
        Ok(FetchResult {
            line_items: request.line_items.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }
}

fn statement_row(symbol: &str, date: &str, revenue: f64) -> StatementRow {
    let values: BTreeMap<String, f64> = INCOME_STATEMENT.columns[2..]
        .iter()
        .enumerate()
        .map(|(i, item)| (item.to_string(), revenue + i as f64))
        .collect();
    StatementRow {
        symbol: symbol.into(),
        as_of_date: date.into(),
        period_type: "3M".into(),
        currency_code: Some("USD".into()),
        values,
    }
}

fn fixture_rows() -> Vec<StatementRow> {
    vec![
        statement_row("JPM", "2016-12-31", 100.0),
        statement_row("JPM", "2017-03-31", 200.0),
        statement_row("JPM", "2022-03-31", 300.0),
        statement_row("GS", "2021-06-30", 400.0),
        statement_row("GS", "2022-06-30", 500.0),
    ]
}

fn etl_in(dir: &Path) -> IncomeStatementEtl {
    IncomeStatementEtl::new(
        EtlBase::new(dir.join("data_lake"))
            .with_bucket("testbucket")
            .with_store(Box::new(LocalStore::new(dir.join("objects")))),
        Box::new(FixtureProvider {
            rows: fixture_rows(),
        }),
        Credentials::new("analyst", "secret"),
    )
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Raw CSV with every whitelisted metric plus an extra column, given dates.
fn write_raw_csv(path: &Path, rows: &[(&str, &str)], skip: Option<&str>) -> PathBuf {
    let metrics: Vec<&str> = INCOME_STATEMENT.columns[2..]
        .iter()
        .copied()
        .filter(|c| Some(*c) != skip)
        .collect();
    let mut text = format!("symbol,asOfDate,periodType,GrossProfit,{}\n", metrics.join(","));
    for (i, (symbol, date)) in rows.iter().enumerate() {
        let values: Vec<String> = (0..metrics.len()).map(|m| format!("{}.5", i * 100 + m)).collect();
        text.push_str(&format!("{symbol},{date},3M,1.0,{}\n", values.join(",")));
    }
    fs::write(path, text).unwrap();
    path.to_path_buf()
}

#[test]
fn extract_writes_one_row_per_symbol_date() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());

    let path = etl.extract(&symbols(&["JPM", "GS"]), None).unwrap();
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.clone()))
        .unwrap()
        .finish()
        .unwrap();

    assert_eq!(raw.height(), 5);
    let names = column_names(&raw);
    assert_eq!(&names[..4], &["symbol", "asOfDate", "periodType", "currencyCode"]);
    assert_eq!(names.len(), 4 + INCOME_STATEMENT.line_items.len());

    let symbols: Vec<Option<&str>> = raw.column("symbol").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(symbols[0], Some("JPM"));
    assert_eq!(symbols[4], Some("GS"));

    let staged = dir.path().join("objects/testbucket/STAGING/income_statement.csv");
    assert_eq!(fs::read(&staged).unwrap(), fs::read(&path).unwrap());
}

#[test]
fn extract_honours_explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let target = dir.path().join("elsewhere/raw.csv");

    let written = etl.extract(&symbols(&["GS"]), Some(&target)).unwrap();
    assert_eq!(written, target);
    assert!(target.is_file());
    assert!(!etl.default_raw_path().exists());
}

#[test]
fn extract_then_transform_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());

    let raw = etl.extract(&symbols(&["JPM", "GS", "JPM"]), None).unwrap();
    let out = dir.path().join("data/income_statement.csv");
    let cleaned = etl.transform(&raw, &out, SaveMode::Csv).unwrap();

    assert_eq!(column_names(&cleaned), INCOME_STATEMENT.columns);
    // 2016-12-31 and 2022-06-30 fall outside the window.
    assert_eq!(cleaned.height(), 3);
    assert!(dir
        .path()
        .join("objects/testbucket/to_warehouse/income_statement_cleaned.csv")
        .is_file());
}

#[test]
fn transform_scenario_keeps_first_day_of_window_only() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2017-01-01"), ("JPM", "2016-12-31")],
        None,
    );
    let out = dir.path().join("out.csv");

    let cleaned = etl.transform(&input, &out, SaveMode::Csv).unwrap();

    assert_eq!(cleaned.height(), 1);
    assert!(cleaned.column("asOfDate").is_err());
    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), INCOME_STATEMENT.columns.join(","));
    assert!(lines.next().unwrap().starts_with("JPM,2017-01-01,"));
    assert!(lines.next().is_none());
}

#[test]
fn transform_missing_whitelisted_column_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2018-03-31")],
        Some("TotalRevenue"),
    );
    let out = dir.path().join("out.csv");

    let err = etl.transform(&input, &out, SaveMode::Csv).unwrap_err();

    assert!(matches!(err, EtlError::SchemaMismatch { ref column } if column == "TotalRevenue"));
    assert!(!out.exists());
    assert!(!dir.path().join("objects/testbucket/to_warehouse").exists());
}

#[test]
fn transform_missing_input_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = etl_in(dir.path())
        .transform(&dir.path().join("nope.csv"), &dir.path().join("out.csv"), SaveMode::Csv)
        .unwrap_err();
    assert!(matches!(err, EtlError::NotFound(_)));
}

#[test]
fn transform_unparseable_date_is_date_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2018-03-31"), ("JPM", "31/03/2018x")],
        None,
    );
    let err = etl_in(dir.path())
        .transform(&input, &dir.path().join("out.csv"), SaveMode::Csv)
        .unwrap_err();
    assert!(matches!(err, EtlError::DateParse { row: 1, .. }));
}

#[test]
fn transform_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2018-03-31"), ("GS", "2019-09-30"), ("MS", "2015-01-01")],
        None,
    );
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    etl.transform(&input, &first, SaveMode::Csv).unwrap();
    etl.transform(&input, &second, SaveMode::Csv).unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

#[test]
fn csv_output_reproduces_returned_table() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2018-03-31"), ("GS", "2019-09-30")],
        None,
    );
    let out = dir.path().join("out.csv");
    let cleaned = etl.transform(&input, &out, SaveMode::Csv).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, column_names(&cleaned));

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), cleaned.height());

    let revenue = cleaned.column("TotalRevenue").unwrap().f64().unwrap();
    for (i, record) in records.iter().enumerate() {
        assert_eq!(&record[0], ["JPM", "GS"][i]);
        let written: f64 = record[2].parse().unwrap();
        assert_eq!(Some(written), revenue.get(i));
    }
    assert_eq!(&records[1][1], "2019-09-30");
}

#[test]
fn transform_parquet_mode_uploads_parquet_key() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let input = write_raw_csv(&dir.path().join("raw.csv"), &[("JPM", "2018-03-31")], None);
    let out = dir.path().join("out.parquet");

    let cleaned = etl.transform(&input, &out, SaveMode::Parquet).unwrap();

    let back = ParquetReader::new(fs::File::open(&out).unwrap()).finish().unwrap();
    assert_eq!(column_names(&back), column_names(&cleaned));
    assert_eq!(back.height(), 1);
    assert!(dir
        .path()
        .join("objects/testbucket/to_warehouse/income_statement_cleaned.parquet")
        .is_file());
}

#[test]
fn custom_window_narrows_output() {
    let dir = tempfile::tempdir().unwrap();
    let window = DateWindow::new(
        chrono::NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
    )
    .unwrap();
    let etl = etl_in(dir.path()).with_window(window);
    let input = write_raw_csv(
        &dir.path().join("raw.csv"),
        &[("JPM", "2018-12-31"), ("JPM", "2019-03-31"), ("JPM", "2019-12-31")],
        None,
    );

    let cleaned = etl
        .transform(&input, &dir.path().join("out.csv"), SaveMode::Csv)
        .unwrap();
    assert_eq!(cleaned.height(), 2);
}

#[test]
fn remove_files_cleans_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let etl = etl_in(dir.path());
    let raw = etl.extract(&symbols(&["JPM"]), None).unwrap();

    etl.remove_files(&[raw.clone(), dir.path().join("never-written.csv")])
        .unwrap();
    assert!(!raw.exists());
}
