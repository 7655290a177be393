//! Test utilities shared by the pipeline stage tests
//!
//! Builders for configurations and records at each stage of the pipeline.

use crate::config::DatasetConfig;
use crate::models::{
    Field, KeyedRecord, Qualifier, RawRecord, RawValue, TaxonComponents, ValidatedRecord,
};
use std::collections::BTreeMap;

mod aggregation_tests;
mod pipeline_tests;
mod pooling_tests;

/// Configuration for a small multi-site survey with a full taxon column
pub fn survey_config() -> DatasetConfig {
    DatasetConfig::default()
        .with_study_id("ST1")
        .with_column(Field::Abundance, "Count")
        .with_column(Field::Taxon, "Taxon")
        .with_column(Field::Latitude, "Lat")
        .with_column(Field::Longitude, "Long")
        .with_column(Field::Plot, "Site")
        .with_column(Field::Day, "Day")
        .with_column(Field::Month, "Month")
        .with_column(Field::Year, "Year")
}

pub fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

/// A raw survey row with the columns of [`survey_config`]
pub fn survey_row(
    row: usize,
    taxon: &str,
    count: RawValue,
    lat: f64,
    lon: f64,
    site: &str,
    year: i64,
) -> RawRecord {
    RawRecord::new(row)
        .with_field("Count", count)
        .with_field("Taxon", text(taxon))
        .with_field("Lat", RawValue::Float(lat))
        .with_field("Long", RawValue::Float(lon))
        .with_field("Site", text(site))
        .with_field("Day", RawValue::Int(15))
        .with_field("Month", RawValue::Int(6))
        .with_field("Year", RawValue::Int(year))
}

/// A validated record at a fixed site with only taxon and abundance set
pub fn validated(row: usize, taxon: &str, abundance: f64) -> ValidatedRecord {
    ValidatedRecord {
        row,
        abundance: Some(abundance),
        biomass: None,
        taxon_label: taxon.to_string(),
        family_label: None,
        latitude: 52.0,
        longitude: 1.0,
        plot: None,
        depth: None,
        day: None,
        month: None,
        year: Some(2001),
        descriptors: BTreeMap::new(),
        retained_pool_values: Vec::new(),
        pooled_rows: 1,
    }
}

pub fn taxon(family: &str, genus: &str, species: &str) -> TaxonComponents {
    TaxonComponents {
        family: family.to_string(),
        genus: genus.to_string(),
        species: species.to_string(),
        qualifier: Qualifier::None,
    }
}

/// A keyed record for aggregation and export tests
pub fn keyed(row: usize, sample_key: &str, genus: &str, species: &str, abundance: f64) -> KeyedRecord {
    KeyedRecord {
        record: validated(row, &format!("{} {}", genus, species), abundance),
        taxon: taxon("", genus, species),
        sample_key: sample_key.to_string(),
    }
}
