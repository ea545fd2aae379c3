//! Fundamentals providers

pub mod provider;
pub mod yahoo;

pub use provider::{
    Credentials, DataError, FetchResult, Frequency, StatementProvider, StatementRequest,
    StatementRow,
};
pub use yahoo::YahooFundamentalsProvider;
