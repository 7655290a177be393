//! Schema validation for contributor tables.
//!
//! Checks column presence and declared column types against an
//! expected-type manifest before any record is touched. Validation only
//! reports: coercion belongs to the field normalizer.

use crate::config::DatasetConfig;
use crate::error::{CuratorError, Result};
use crate::models::Field;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Expected type class for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnClass {
    /// Integer or floating point
    Numeric,
    /// Discrete values: integers or strings, never continuous floats
    IntegerOrCategorical,
    /// Strings or categoricals
    TextOrCategorical,
    /// Presence is checked, type is not
    Any,
}

impl ColumnClass {
    /// Default class for a canonical role
    pub fn for_field(field: Field) -> Self {
        match field {
            Field::Abundance | Field::Biomass | Field::Latitude | Field::Longitude => {
                ColumnClass::Numeric
            }
            Field::Day | Field::Month | Field::Year => ColumnClass::IntegerOrCategorical,
            Field::Taxon | Field::Genus | Field::Species | Field::Family => {
                ColumnClass::TextOrCategorical
            }
            Field::Plot | Field::Depth => ColumnClass::Any,
        }
    }

    /// Whether a polars dtype satisfies this class. All-null columns always do.
    pub fn accepts(&self, dtype: &DataType) -> bool {
        if matches!(dtype, DataType::Null) {
            return true;
        }
        match self {
            ColumnClass::Numeric => dtype.is_integer() || dtype.is_float(),
            ColumnClass::IntegerOrCategorical => {
                dtype.is_integer() || dtype.is_string() || dtype.is_categorical()
            }
            ColumnClass::TextOrCategorical => dtype.is_string() || dtype.is_categorical(),
            ColumnClass::Any => true,
        }
    }
}

impl fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnClass::Numeric => "numeric",
            ColumnClass::IntegerOrCategorical => "integer-or-categorical",
            ColumnClass::TextOrCategorical => "text-or-categorical",
            ColumnClass::Any => "any",
        };
        f.write_str(name)
    }
}

/// A structural defect found in a contributor table
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' has type {observed}, expected {expected}")]
    WrongType {
        column: String,
        expected: ColumnClass,
        observed: String,
    },

    #[error("table has no data rows")]
    EmptyTable,
}

/// One expected column
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub column: String,
    pub class: ColumnClass,
}

/// Expected columns and their type classes for one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedTypeManifest {
    entries: Vec<ManifestEntry>,
}

impl ExpectedTypeManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the manifest from a dataset's column mapping and overrides
    pub fn from_config(config: &DatasetConfig) -> Self {
        let mut manifest = Self::new();

        for (field, column) in config.columns.iter() {
            // Broadcast coordinates make the coordinate columns irrelevant
            if config.rules.fixed_coordinates.is_some()
                && matches!(field, Field::Latitude | Field::Longitude)
            {
                continue;
            }
            let class = config
                .expected_types
                .get(column)
                .copied()
                .unwrap_or_else(|| ColumnClass::for_field(field));
            manifest.insert(column, class);
        }

        for column in &config.rules.pool_fields {
            manifest.insert(column, ColumnClass::Any);
        }

        for (column, class) in &config.expected_types {
            manifest.insert(column, *class);
        }

        manifest
    }

    /// Add or replace the expectation for a column
    pub fn insert(&mut self, column: &str, class: ColumnClass) {
        match self.entries.iter_mut().find(|e| e.column == column) {
            Some(entry) => entry.class = class,
            None => self.entries.push(ManifestEntry {
                column: column.to_string(),
                class,
            }),
        }
    }

    pub fn with_column(mut self, column: &str, class: ColumnClass) -> Self {
        self.insert(column, class);
        self
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

/// Gatekeeper run before any record-level processing
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    manifest: ExpectedTypeManifest,
}

impl SchemaValidator {
    pub fn new(manifest: ExpectedTypeManifest) -> Self {
        Self { manifest }
    }

    pub fn from_config(config: &DatasetConfig) -> Self {
        Self::new(ExpectedTypeManifest::from_config(config))
    }

    /// Report every violation in the table, never mutating it
    pub fn validate(&self, df: &DataFrame) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if df.height() == 0 {
            violations.push(SchemaViolation::EmptyTable);
        }

        for entry in self.manifest.entries() {
            match df.column(&entry.column) {
                Ok(column) => {
                    let dtype = column.dtype();
                    if !entry.class.accepts(dtype) {
                        violations.push(SchemaViolation::WrongType {
                            column: entry.column.clone(),
                            expected: entry.class,
                            observed: dtype.to_string(),
                        });
                    }
                }
                Err(_) => violations.push(SchemaViolation::MissingColumn {
                    column: entry.column.clone(),
                }),
            }
        }

        debug!(
            "Schema check over {} expected columns found {} violations",
            self.manifest.entries().len(),
            violations.len()
        );
        violations
    }

    /// Fail the run with a structural error when any violation exists
    pub fn check(&self, df: &DataFrame, dataset: &str) -> Result<()> {
        let violations = self.validate(df);
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            warn!("{}: {}", dataset, violation);
        }
        Err(CuratorError::Structural {
            dataset: dataset.to_string(),
            violations,
        })
    }
}
