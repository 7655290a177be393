//! Configuration management and validation.
//!
//! A [`DatasetConfig`] describes one contributed dataset: where its table
//! lives, how its columns map onto canonical roles, and the correction and
//! normalization rules applied by the pipeline. Configurations are loaded
//! from TOML and are immutable for the duration of a run.

use crate::constants::{DEFAULT_INFER_SCHEMA_ROWS, DEFAULT_SAMPLE_KEY_FIELDS};
use crate::error::{CuratorError, Result};
use crate::models::Field;
use crate::schema::ColumnClass;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where and how to read the contributor table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the delimited table, relative paths resolve against the config file
    pub path: PathBuf,

    /// Number of lines to skip before the header row
    pub header_offset: usize,

    /// Field separator
    pub separator: char,

    /// Rows sampled for column type inference
    pub infer_schema_rows: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            header_offset: 0,
            separator: ',',
            infer_schema_rows: DEFAULT_INFER_SCHEMA_ROWS,
        }
    }
}

/// Accepted longitude convention for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudeRange {
    /// Dataset convention: [0, 180]
    #[default]
    Eastern,
    /// Full WGS84 range: [-180, 180]
    Full,
}

impl LongitudeRange {
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            LongitudeRange::Eastern => (0.0, 180.0),
            LongitudeRange::Full => (-180.0, 180.0),
        }
    }

    pub fn contains(&self, longitude: f64) -> bool {
        let (min, max) = self.bounds();
        (min..=max).contains(&longitude)
    }
}

/// What to do with a parenthetical subgenus following the genus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgenusPolicy {
    /// The parenthesised name replaces the genus
    #[default]
    Promote,
    /// The parenthesised name is dropped
    Discard,
}

/// Record-level normalization rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Source columns summed over rather than kept distinct (life stage, sex, ...)
    pub pool_fields: BTreeSet<String>,

    /// Taxon labels never pooled
    pub pool_exempt_taxa: BTreeSet<String>,

    /// Single site broadcast to every record, as (latitude, longitude)
    pub fixed_coordinates: Option<(f64, f64)>,

    /// Ordered descriptor fields joined into the sample key
    pub sample_key_fields: Vec<String>,

    /// Secondary fields whose blank value makes group assignment impossible
    pub required_secondary_fields: Vec<Field>,

    /// Fields used for keying only, blanked in the export
    pub clear_after_keying: Vec<Field>,

    pub longitude_range: LongitudeRange,

    pub subgenus_policy: SubgenusPolicy,

    /// Measurement whose sanity rules gate each record (defaults to abundance when mapped)
    pub primary_measurement: Option<Field>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            pool_fields: BTreeSet::new(),
            pool_exempt_taxa: BTreeSet::new(),
            fixed_coordinates: None,
            sample_key_fields: DEFAULT_SAMPLE_KEY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            required_secondary_fields: Vec::new(),
            clear_after_keying: Vec::new(),
            longitude_range: LongitudeRange::default(),
            subgenus_policy: SubgenusPolicy::default(),
            primary_measurement: None,
        }
    }
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Supported compression algorithms for parquet exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: ExportFormat,
    pub compression: CompressionAlgorithm,
    /// Output file stem, defaults to the dataset name
    pub file_stem: Option<String>,
}

/// Contributor column names for each canonical role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub abundance: Option<String>,
    pub biomass: Option<String>,
    pub taxon: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub family: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub plot: Option<String>,
    pub depth: Option<String>,
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
}

impl ColumnMapping {
    const ROLES: [Field; 13] = [
        Field::Abundance,
        Field::Biomass,
        Field::Taxon,
        Field::Genus,
        Field::Species,
        Field::Family,
        Field::Latitude,
        Field::Longitude,
        Field::Plot,
        Field::Depth,
        Field::Day,
        Field::Month,
        Field::Year,
    ];

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Abundance => &self.abundance,
            Field::Biomass => &self.biomass,
            Field::Taxon => &self.taxon,
            Field::Genus => &self.genus,
            Field::Species => &self.species,
            Field::Family => &self.family,
            Field::Latitude => &self.latitude,
            Field::Longitude => &self.longitude,
            Field::Plot => &self.plot,
            Field::Depth => &self.depth,
            Field::Day => &self.day,
            Field::Month => &self.month,
            Field::Year => &self.year,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Abundance => &mut self.abundance,
            Field::Biomass => &mut self.biomass,
            Field::Taxon => &mut self.taxon,
            Field::Genus => &mut self.genus,
            Field::Species => &mut self.species,
            Field::Family => &mut self.family,
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::Plot => &mut self.plot,
            Field::Depth => &mut self.depth,
            Field::Day => &mut self.day,
            Field::Month => &mut self.month,
            Field::Year => &mut self.year,
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.slot(field).is_some()
    }

    pub fn set(&mut self, field: Field, column: impl Into<String>) {
        *self.slot_mut(field) = Some(column.into());
    }

    /// Mapped (role, column) pairs in role order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Self::ROLES
            .into_iter()
            .filter_map(|field| self.get(field).map(|column| (field, column)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full configuration for one dataset curation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset identifier, exported as StudyID and usable as a sample key field
    pub study_id: Option<String>,

    pub input: InputConfig,

    /// Canonical role -> contributor column name
    pub columns: ColumnMapping,

    /// Contributor column -> expected class, overriding the role default
    pub expected_types: BTreeMap<String, ColumnClass>,

    pub rules: RuleConfig,

    /// Known genus misspellings, exact match old -> new
    pub genus_corrections: BTreeMap<String, String>,

    /// Secondary field value corrections, exact match old -> new
    pub secondary_field_renames: BTreeMap<String, String>,

    pub output: OutputConfig,
}

impl DatasetConfig {
    /// Load a dataset configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: DatasetConfig =
            toml::from_str(&contents).map_err(|e| CuratorError::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if config.input.path.is_relative() {
            if let Some(parent) = path.parent() {
                config.input.path = parent.join(&config.input.path);
            }
        }

        debug!(
            "Loaded dataset configuration from {} ({} mapped columns)",
            path.display(),
            config.columns.len()
        );
        Ok(config)
    }

    /// Check that the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if !self.columns.iter().any(|(f, _)| f.is_measurement()) {
            return Err(CuratorError::configuration(
                "at least one of abundance or biomass must be mapped",
            ));
        }

        let primary = self.primary_measurement();
        if !self.columns.contains(primary) {
            return Err(CuratorError::configuration(format!(
                "primary measurement '{}' is not mapped to a column",
                primary
            )));
        }

        if !self.columns.contains(Field::Taxon) && !self.columns.contains(Field::Genus) {
            return Err(CuratorError::configuration(
                "a taxon or genus column must be mapped",
            ));
        }

        match self.rules.fixed_coordinates {
            Some((lat, lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !self.rules.longitude_range.contains(lon) {
                    return Err(CuratorError::configuration(format!(
                        "fixed coordinates ({}, {}) are outside the valid range",
                        lat, lon
                    )));
                }
            }
            None => {
                for field in [Field::Latitude, Field::Longitude] {
                    if !self.columns.contains(field) {
                        return Err(CuratorError::configuration(format!(
                            "'{}' must be mapped when no fixed coordinates are configured",
                            field
                        )));
                    }
                }
            }
        }

        if self.rules.sample_key_fields.is_empty() {
            return Err(CuratorError::configuration(
                "sample_key_fields must name at least one field",
            ));
        }

        if let Some(field) = self
            .rules
            .required_secondary_fields
            .iter()
            .find(|f| !f.is_secondary())
        {
            return Err(CuratorError::configuration(format!(
                "'{}' is not a secondary field and cannot be required",
                field
            )));
        }

        if let Some(field) = self.rules.clear_after_keying.iter().find(|f| {
            !matches!(
                f,
                Field::Plot | Field::Depth | Field::Day | Field::Month | Field::Year
            )
        }) {
            return Err(CuratorError::configuration(format!(
                "'{}' cannot be cleared after keying",
                field
            )));
        }

        // Pooling only sees unmapped descriptor columns
        for pool_field in &self.rules.pool_fields {
            let mapped = self
                .columns
                .iter()
                .find(|(_, column)| *column == pool_field.as_str());
            if let Some((field, _)) = mapped {
                return Err(CuratorError::configuration(format!(
                    "pool field '{}' is mapped to the '{}' role",
                    pool_field, field
                )));
            }
        }

        Ok(())
    }

    /// Measurement that gates record acceptance
    pub fn primary_measurement(&self) -> Field {
        self.rules.primary_measurement.unwrap_or_else(|| {
            if self.columns.contains(Field::Abundance) {
                Field::Abundance
            } else {
                Field::Biomass
            }
        })
    }

    /// Contributor column mapped to a role
    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(field)
    }

    /// Human-readable dataset name used in logs and output file names
    pub fn dataset_name(&self) -> String {
        if let Some(stem) = &self.output.file_stem {
            return stem.clone();
        }
        if let Some(id) = &self.study_id {
            return id.clone();
        }
        self.input
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string())
    }

    /// Create configuration with a dataset identifier
    pub fn with_study_id(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    /// Map a canonical role onto a contributor column
    pub fn with_column(mut self, field: Field, column: impl Into<String>) -> Self {
        self.columns.set(field, column);
        self
    }

    /// Set the input table path
    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input.path = path.into();
        self
    }

    /// Broadcast one site to every record
    pub fn with_fixed_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.rules.fixed_coordinates = Some((latitude, longitude));
        self
    }

    /// Set the ordered sample key fields
    pub fn with_sample_key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.sample_key_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Pool measurements over a source column
    pub fn with_pool_field(mut self, column: impl Into<String>) -> Self {
        self.rules.pool_fields.insert(column.into());
        self
    }

    /// Exempt a taxon label from pooling
    pub fn with_pool_exempt_taxon(mut self, label: impl Into<String>) -> Self {
        self.rules.pool_exempt_taxa.insert(label.into());
        self
    }

    /// Add a genus correction
    pub fn with_genus_correction(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.genus_corrections.insert(from.into(), to.into());
        self
    }

    /// Add a secondary field value correction
    pub fn with_secondary_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.secondary_field_renames.insert(from.into(), to.into());
        self
    }

    /// Reject records with a blank value in this secondary field
    pub fn with_required_secondary_field(mut self, field: Field) -> Self {
        self.rules.required_secondary_fields.push(field);
        self
    }

    /// Blank this field in the export after keying
    pub fn with_clear_after_keying(mut self, field: Field) -> Self {
        self.rules.clear_after_keying.push(field);
        self
    }

    /// Set the longitude convention
    pub fn with_longitude_range(mut self, range: LongitudeRange) -> Self {
        self.rules.longitude_range = range;
        self
    }

    /// Set the subgenus policy
    pub fn with_subgenus_policy(mut self, policy: SubgenusPolicy) -> Self {
        self.rules.subgenus_policy = policy;
        self
    }

    /// Set the export format
    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.output.format = format;
        self
    }
}
