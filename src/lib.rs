//! Survey Curator Library
//!
//! Curates contributed ecological survey datasets (species counts per site
//! and time) into a canonical long-term record schema.
//!
//! This library provides tools for:
//! - Structural validation of contributed tables against an expected-type manifest
//! - Primary-field rules, type coercion and optional pooling of subdivisions
//! - Deterministic decomposition and correction of free-text taxon labels
//! - Reproducible sampling-event keys and event-level aggregation
//! - Canonical CSV/Parquet export with a curation report
//! - Convex-hull centroid and area of the sampled locations

pub mod cli {
    pub mod args;
    pub mod commands;
}
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod spatial;

pub use config::DatasetConfig;
pub use error::{CuratorError, Result};
pub use models::{CanonicalRecord, Field, RawRecord, RawValue, SpatialSummary, TaxonComponents};
pub use pipeline::report::CurationReport;
pub use pipeline::{CurationOutput, CurationPipeline};
