//! Yahoo Finance fundamentals provider.
//!
//! Fetches statement line items from Yahoo's fundamentals-timeseries API, one
//! request per symbol, and pivots the per-item series into one row per
//! (symbol, asOfDate, periodType, currencyCode).
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes, so every decode failure is reported as `ResponseFormatChanged`.

use super::provider::{
    Credentials, DataError, FetchResult, StatementProvider, StatementRequest, StatementRow,
};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Earliest period Yahoo serves fundamentals for (1985-08-21).
const PERIOD1: i64 = 493_590_046;

/// Path below the base URL; the symbol is appended as one more segment.
const TIMESERIES_PATH: &[&str] = &["ws", "fundamentals-timeseries", "v1", "finance", "timeseries"];

/// Prefix Yahoo uses for trailing-twelve-month series.
const TRAILING_PREFIX: &str = "trailing";

/// Fundamentals-timeseries API response.
#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    result: Option<Vec<Value>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Observation {
    as_of_date: String,
    period_type: String,
    currency_code: Option<String>,
    reported_value: ReportedValue,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: f64,
}

type RowKey = (String, String, Option<String>);

/// Yahoo Finance fundamentals provider.
pub struct YahooFundamentalsProvider {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl YahooFundamentalsProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://query2.finance.yahoo.com";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, DataError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)
            .map_err(|e| DataError::Client(format!("invalid base URL '{raw}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::Client(format!(
                "base URL '{base_url}' cannot hold a path"
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Provider pointed at the public Yahoo endpoint with a 30s timeout.
    pub fn with_defaults() -> Result<Self, DataError> {
        Self::new(Self::DEFAULT_BASE_URL, Self::DEFAULT_TIMEOUT)
    }

    /// Timeseries endpoint for `symbol`. The symbol is one percent-encoded
    /// path segment, so `BRK/B` cannot escape into the path.
    fn timeseries_url(&self, symbol: &str) -> Result<Url, DataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DataError::Client(format!("base URL '{}' cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(TIMESERIES_PATH)
            .push(symbol);
        Ok(url)
    }

    /// Yahoo type names for a request, e.g. `quarterlyTotalRevenue`.
    fn type_names(request: &StatementRequest<'_>) -> Vec<String> {
        let prefix = request.frequency.type_prefix();
        let mut types: Vec<String> = request
            .line_items
            .iter()
            .map(|item| format!("{prefix}{item}"))
            .collect();
        if request.trailing {
            types.extend(
                request
                    .line_items
                    .iter()
                    .map(|item| format!("{TRAILING_PREFIX}{item}")),
            );
        }
        types
    }

    /// Strip the frequency or trailing prefix from a Yahoo type name.
    fn line_item_name<'t>(type_name: &'t str, request: &StatementRequest<'_>) -> Option<&'t str> {
        type_name
            .strip_prefix(request.frequency.type_prefix())
            .or_else(|| {
                request
                    .trailing
                    .then(|| type_name.strip_prefix(TRAILING_PREFIX))
                    .flatten()
            })
    }

    /// Pivot a timeseries response into rows for one symbol, sorted by date.
    fn parse_response(
        symbol: &str,
        resp: TimeseriesResponse,
        request: &StatementRequest<'_>,
    ) -> Result<Vec<StatementRow>, DataError> {
        if let Some(err) = resp.timeseries.error {
            if err.code == "Not Found" {
                warn!(symbol, "provider has no fundamentals for symbol");
                return Ok(Vec::new());
            }
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        let series = resp.timeseries.result.unwrap_or_default();
        let mut grouped: BTreeMap<RowKey, BTreeMap<String, f64>> = BTreeMap::new();

        for entry in &series {
            let type_name = entry
                .pointer("/meta/type/0")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("series without meta.type for {symbol}"))
                })?;

            let Some(item) = Self::line_item_name(type_name, request) else {
                debug!(symbol, type_name, "skipping unrequested series");
                continue;
            };

            // Series with no observations carry only meta and timestamp.
            let Some(points) = entry.get(type_name).and_then(Value::as_array) else {
                continue;
            };

            for point in points.iter().filter(|p| !p.is_null()) {
                let obs: Observation = serde_json::from_value(point.clone()).map_err(|e| {
                    DataError::ResponseFormatChanged(format!(
                        "bad observation in {type_name} for {symbol}: {e}"
                    ))
                })?;
                grouped
                    .entry((obs.as_of_date, obs.period_type, obs.currency_code))
                    .or_default()
                    .insert(item.to_string(), obs.reported_value.raw);
            }
        }

        Ok(grouped
            .into_iter()
            .map(|((as_of_date, period_type, currency_code), values)| StatementRow {
                symbol: symbol.to_string(),
                as_of_date,
                period_type,
                currency_code,
                values,
            })
            .collect())
    }

    fn fetch_symbol(
        &self,
        symbol: &str,
        types: &str,
        period2: i64,
        request: &StatementRequest<'_>,
        (user, pass): (&str, &str),
    ) -> Result<Vec<StatementRow>, DataError> {
        let period1 = PERIOD1.to_string();
        let period2 = period2.to_string();
        let resp = self
            .client
            .get(self.timeseries_url(symbol)?)
            .query(&[
                ("symbol", symbol),
                ("type", types),
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
            ])
            .basic_auth(user, Some(pass))
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("{symbol}: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(format!(
                "provider rejected credentials (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body: TimeseriesResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        Self::parse_response(symbol, body, request)
    }
}

impl StatementProvider for YahooFundamentalsProvider {
    fn name(&self) -> &str {
        "yahoo_fundamentals"
    }

    fn fetch_statement(
        &self,
        symbols: &[&str],
        request: &StatementRequest<'_>,
        credentials: &Credentials,
    ) -> Result<FetchResult, DataError> {
        let login = credentials.require()?;
        let types = Self::type_names(request).join(",");
        let period2 = chrono::Utc::now().timestamp();

        let mut rows = Vec::new();
        for symbol in symbols {
            let symbol_rows = self.fetch_symbol(symbol, &types, period2, request, login)?;
            info!(symbol, rows = symbol_rows.len(), "fetched statement");
            rows.extend(symbol_rows);
        }

        if rows.is_empty() {
            return Err(DataError::ResponseFormatChanged(format!(
                "no statement rows returned for {}",
                symbols.join(", ")
            )));
        }

        Ok(FetchResult {
            line_items: request.line_items.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }
}
