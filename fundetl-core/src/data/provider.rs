//! Statement provider trait, credentials and structured error types.
//!
//! The StatementProvider trait abstracts over fundamentals sources so the ETL
//! can be driven against Yahoo Finance in production and a mock server in tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Environment variable holding the provider username.
pub const USERNAME_VAR: &str = "YFINANCE_USER";
/// Environment variable holding the provider password.
pub const PASSWORD_VAR: &str = "YFINANCE_PASSWORD";

/// Provider login, constructed once and handed to the ETL.
///
/// Either field may be absent; that only becomes an error when a fetch is
/// attempted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Read `YFINANCE_USER` / `YFINANCE_PASSWORD`, honouring a `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let non_empty = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());
        Self {
            username: non_empty(USERNAME_VAR),
            password: non_empty(PASSWORD_VAR),
        }
    }

    /// Both parts, or an authentication error naming what is missing.
    pub fn require(&self) -> Result<(&str, &str), DataError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Ok((user, pass)),
            (None, _) => Err(DataError::AuthenticationRequired(format!(
                "{USERNAME_VAR} is not set"
            ))),
            (_, None) => Err(DataError::AuthenticationRequired(format!(
                "{PASSWORD_VAR} is not set"
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Reporting frequency requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Annual,
    Quarterly,
}

impl Frequency {
    /// Prefix the provider puts in front of every line-item type.
    pub fn type_prefix(self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
        }
    }
}

/// What to fetch: which line items, at which frequency.
#[derive(Debug, Clone)]
pub struct StatementRequest<'a> {
    pub line_items: &'a [&'a str],
    pub frequency: Frequency,
    /// Include trailing-twelve-month rows.
    pub trailing: bool,
}

/// One (symbol, reporting date) row as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub symbol: String,
    pub as_of_date: String,
    pub period_type: String,
    pub currency_code: Option<String>,
    /// Line item name (without frequency prefix) to reported value.
    pub values: BTreeMap<String, f64>,
}

/// Result of one provider call across all requested symbols.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Line items requested, in request order. Every one becomes a column.
    pub line_items: Vec<String>,
    pub rows: Vec<StatementRow>,
}

/// Structured error types for provider operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("upstream returned HTTP {status} for {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl DataError {
    /// True for failures caused by rejected or missing credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, DataError::AuthenticationRequired(_))
    }
}

/// Trait for fundamentals providers.
///
/// One call covers every symbol; implementations decide how many requests
/// that takes. Providers know nothing about files or object storage.
pub trait StatementProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch statement rows for all `symbols`, in symbol order.
    fn fetch_statement(
        &self,
        symbols: &[&str],
        request: &StatementRequest<'_>,
        credentials: &Credentials,
    ) -> Result<FetchResult, DataError>;
}
