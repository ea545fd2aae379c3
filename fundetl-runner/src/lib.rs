//! fundetl runner: configuration and the extract/transform/load/cleanup driver.
//!
//! This crate builds on `fundetl-core` to provide:
//! - `PipelineConfig` loaded from TOML with driver defaults
//! - `Pipeline`, which wires paths and symbols through the four steps
//! - `PipelineReport`, the serializable summary of a completed run

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{ConfigError, PipelineConfig, ProviderConfig, StorageConfig, StorageKind};
pub use pipeline::{Pipeline, PipelineError, Step};
pub use report::{hash_file, PipelineReport};
