//! Error handling for survey curation runs.
//!
//! Run-level failures (configuration, I/O, structural schema violations,
//! broken aggregation invariants) are fatal and surface as [`CuratorError`].
//! Record-level problems never abort a run; they are collected as
//! rejections and warnings in the [`crate::pipeline::report::CurationReport`].

use crate::schema::SchemaViolation;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Dataset not found at path: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Structural validation failed for {dataset}: {}", format_violations(violations))]
    Structural {
        dataset: String,
        violations: Vec<SchemaViolation>,
    },

    #[error(
        "Aggregation invariant violated in {dataset}: {duplicates} duplicate (sample, family, genus, species) tuples remain, first: {example}"
    )]
    AggregationInvariantViolation {
        dataset: String,
        duplicates: usize,
        example: String,
    },

    #[error("Export failed for file: {path} - {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

impl CuratorError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, CuratorError>;
