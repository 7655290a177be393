//! Canonical projection and serialization
//!
//! Projects aggregated records into the canonical schema by named field,
//! orders them deterministically and writes them as CSV or Parquet. The
//! exporter never filters: every record in is a row out.

use crate::config::{DatasetConfig, ExportFormat, OutputConfig};
use crate::constants::columns;
use crate::error::{CuratorError, Result};
use crate::models::{CanonicalRecord, KeyedRecord};
use polars::prelude::{
    Column, CsvWriter, DataFrame, ParquetWriter as PolarsParquetWriter, SerWriter,
};
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

/// Project keyed records into sorted canonical rows
pub fn to_canonical(records: &[KeyedRecord], config: &DatasetConfig) -> Vec<CanonicalRecord> {
    let study_id = config.study_id.clone().filter(|id| !id.trim().is_empty());

    let mut rows: Vec<CanonicalRecord> = records
        .iter()
        .map(|keyed| {
            let record = &keyed.record;
            CanonicalRecord {
                abundance: record.abundance,
                biomass: record.biomass,
                family: keyed.taxon.family.clone(),
                genus: keyed.taxon.genus.clone(),
                species: keyed.taxon.species.clone(),
                sample_description: keyed.sample_key.clone(),
                plot: record.plot.clone(),
                latitude: record.latitude,
                longitude: record.longitude,
                depth_elevation: record.depth.clone(),
                day: record.day.map(|d| d.to_string()),
                month: record.month.map(|m| m.to_string()),
                year: record.year,
                study_id: study_id.clone(),
            }
        })
        .collect();

    rows.sort_by(compare_rows);
    rows
}

/// Year, family, genus, species ascending with blanks last, then sample
fn compare_rows(a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
    blanks_last(a.year, b.year)
        .then_with(|| text_blanks_last(&a.family, &b.family))
        .then_with(|| text_blanks_last(&a.genus, &b.genus))
        .then_with(|| text_blanks_last(&a.species, &b.species))
        .then_with(|| a.sample_description.cmp(&b.sample_description))
}

fn blanks_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn text_blanks_last(a: &str, b: &str) -> Ordering {
    blanks_last(
        Some(a).filter(|s| !s.is_empty()),
        Some(b).filter(|s| !s.is_empty()),
    )
}

/// Build a DataFrame in the canonical column order
pub fn to_frame(rows: &[CanonicalRecord]) -> Result<DataFrame> {
    // Blank text goes out as null so every blank serializes the same way
    let text = |f: fn(&CanonicalRecord) -> Option<String>| -> Vec<Option<String>> {
        rows.iter()
            .map(|r| f(r).filter(|value| !value.is_empty()))
            .collect()
    };

    let frame = DataFrame::new(vec![
        Column::new(
            columns::ABUNDANCE.into(),
            rows.iter().map(|r| r.abundance).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            columns::BIOMASS.into(),
            rows.iter().map(|r| r.biomass).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(columns::FAMILY.into(), text(|r| Some(r.family.clone()))),
        Column::new(columns::GENUS.into(), text(|r| Some(r.genus.clone()))),
        Column::new(columns::SPECIES.into(), text(|r| Some(r.species.clone()))),
        Column::new(
            columns::SAMPLE_DESCRIPTION.into(),
            text(|r| Some(r.sample_description.clone())),
        ),
        Column::new(columns::PLOT.into(), text(|r| r.plot.clone())),
        Column::new(
            columns::LATITUDE.into(),
            rows.iter().map(|r| r.latitude).collect::<Vec<f64>>(),
        ),
        Column::new(
            columns::LONGITUDE.into(),
            rows.iter().map(|r| r.longitude).collect::<Vec<f64>>(),
        ),
        Column::new(
            columns::DEPTH_ELEVATION.into(),
            text(|r| r.depth_elevation.clone()),
        ),
        Column::new(columns::DAY.into(), text(|r| r.day.clone())),
        Column::new(columns::MONTH.into(), text(|r| r.month.clone())),
        Column::new(
            columns::YEAR.into(),
            rows.iter().map(|r| r.year).collect::<Vec<Option<i32>>>(),
        ),
        Column::new(columns::STUDY_ID.into(), text(|r| r.study_id.clone())),
    ])?;

    Ok(frame)
}

/// Write canonical rows to `path` in the configured format
pub fn write_export(rows: &[CanonicalRecord], path: &Path, output: &OutputConfig) -> Result<()> {
    let mut df = to_frame(rows)?;
    let file = std::fs::File::create(path)?;

    let written = match output.format {
        ExportFormat::Csv => CsvWriter::new(file).include_header(true).finish(&mut df),
        ExportFormat::Parquet => PolarsParquetWriter::new(file)
            .with_compression(output.compression.to_polars_compression())
            .finish(&mut df)
            .map(|_| ()),
    };

    written.map_err(|e| CuratorError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Coordinate pairs of the export, in row order
pub fn coordinates(rows: &[CanonicalRecord]) -> Vec<(f64, f64)> {
    rows.iter().map(|r| (r.latitude, r.longitude)).collect()
}
