//! Core data structures and types for survey curation.
//!
//! Defines the record types that move through the pipeline, from untyped
//! input rows to canonical export records, and the field roles that the
//! column mapping assigns to contributor columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::BLANK_MARKERS;

/// Roles a contributor column can be mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Abundance,
    Biomass,
    /// Full free-text taxon label ("Genus species ...")
    Taxon,
    Genus,
    Species,
    Family,
    Latitude,
    Longitude,
    Plot,
    Depth,
    Day,
    Month,
    Year,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Abundance => "abundance",
            Field::Biomass => "biomass",
            Field::Taxon => "taxon",
            Field::Genus => "genus",
            Field::Species => "species",
            Field::Family => "family",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Plot => "plot",
            Field::Depth => "depth",
            Field::Day => "day",
            Field::Month => "month",
            Field::Year => "year",
        }
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self, Field::Abundance | Field::Biomass)
    }

    pub fn is_secondary(&self) -> bool {
        matches!(self, Field::Plot | Field::Depth)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Untyped scalar cell as read from the contributor table
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Blank covers nulls, NaN, empty strings and conventional NA markers
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Int(_) => false,
            RawValue::Float(v) => v.is_nan(),
            RawValue::Text(s) => {
                let trimmed = s.trim().to_ascii_lowercase();
                BLANK_MARKERS.contains(&trimmed.as_str())
            }
        }
    }

    /// Trimmed textual form, `None` when blank
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        match self {
            RawValue::Null => None,
            RawValue::Int(v) => Some(v.to_string()),
            RawValue::Float(v) => Some(format_number(*v)),
            RawValue::Text(s) => Some(s.trim().to_string()),
        }
    }

    /// Numeric form; `Ok(None)` when blank, `Err` with the offending text when not numeric
    pub fn as_f64(&self) -> std::result::Result<Option<f64>, String> {
        if self.is_blank() {
            return Ok(None);
        }
        match self {
            RawValue::Null => Ok(None),
            RawValue::Int(v) => Ok(Some(*v as f64)),
            RawValue::Float(v) => Ok(Some(*v)),
            RawValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| s.trim().to_string()),
        }
    }
}

/// Render a float without a trailing `.0` for integral values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Add two optional measurements; blank plus blank stays blank
pub fn sum_measurements(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

/// One row of contributor-supplied data
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based data row number in the source table
    pub row: usize,
    pub fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: RawValue) -> Self {
        self.fields.insert(column.into(), value);
        self
    }

    pub fn get(&self, column: &str) -> &RawValue {
        self.fields.get(column).unwrap_or(&RawValue::Null)
    }
}

/// A record after type coercion and primary-field filtering
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub row: usize,
    pub abundance: Option<f64>,
    pub biomass: Option<f64>,
    /// Free-text taxon label assembled from the mapped taxon columns
    pub taxon_label: String,
    pub family_label: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub plot: Option<String>,
    pub depth: Option<String>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    /// Textual form of every unmapped source column, by column name
    pub descriptors: BTreeMap<String, String>,
    /// Pool-field values kept for taxa exempt from pooling
    pub retained_pool_values: Vec<String>,
    /// Number of source rows merged into this record by pooling
    pub pooled_rows: usize,
}

/// Identification qualifier attached to a parsed taxon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualifier {
    None,
    Uncertain,
    Aggregate,
}

/// Family / genus / species decomposition of a taxon label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxonComponents {
    pub family: String,
    pub genus: String,
    pub species: String,
    pub qualifier: Qualifier,
}

impl fmt::Display for TaxonComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.family.is_empty(), self.genus.is_empty()) {
            (_, false) => write!(f, "{} {}", self.genus, self.species),
            (false, true) => write!(f, "{} {}", self.family, self.species),
            (true, true) => f.write_str(&self.species),
        }
    }
}

/// A validated, parsed record carrying its sampling-event identity
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub record: ValidatedRecord,
    pub taxon: TaxonComponents,
    pub sample_key: String,
}

impl KeyedRecord {
    /// The (sample, family, genus, species) tuple that must be unique after aggregation
    pub fn identity(&self) -> (&str, &str, &str, &str) {
        (
            &self.sample_key,
            &self.taxon.family,
            &self.taxon.genus,
            &self.taxon.species,
        )
    }
}

/// One exported row of the canonical schema
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanonicalRecord {
    pub abundance: Option<f64>,
    pub biomass: Option<f64>,
    pub family: String,
    pub genus: String,
    pub species: String,
    pub sample_description: String,
    pub plot: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_elevation: Option<String>,
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "StudyID")]
    pub study_id: Option<String>,
}

/// Derived spatial metadata for an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialSummary {
    pub central_latitude: f64,
    pub central_longitude: f64,
    pub area_sq_km: f64,
}
