//! fundetl core: statement ETL contract, fundamentals provider, object storage.
//!
//! This crate contains everything one pipeline step needs:
//! - Provider trait and the Yahoo Finance fundamentals client
//! - Object storage trait with S3 (Signature V4) and local-directory backends
//! - The `StatementEtl` contract, shared `EtlBase` state and the income
//!   statement implementation
//! - Table helpers for rename, calendar-window filtering and projection

pub mod data;
pub mod etl;
pub mod storage;

pub use data::{Credentials, DataError, StatementProvider, YahooFundamentalsProvider};
pub use etl::{
    DateWindow, EtlBase, EtlError, IncomeStatementEtl, SaveMode, StatementEtl, StatementSchema,
};
pub use storage::{LocalStore, ObjectStore, ObjectUri, S3Store, StoreError};
