//! Tests for the full record-level pipeline and its outputs

use super::super::report::{RejectionKind, WarningKind};
use super::super::CurationPipeline;
use super::{survey_config, survey_row};
use crate::error::CuratorError;
use crate::models::{Field, RawRecord, RawValue, SpatialSummary};
use crate::spatial::{GeometryEngine, GeometryError, SpatialSummarizer};
use polars::prelude::*;
use tempfile::TempDir;

fn survey_rows() -> Vec<RawRecord> {
    vec![
        survey_row(1, "Araneus diadematus", RawValue::Int(3), 52.0, 1.0, "A", 2001),
        survey_row(2, "Lycosa sp1", RawValue::Int(2), 52.0, 1.0, "A", 2001),
        survey_row(3, "Lycosa sp2", RawValue::Int(1), 52.0, 1.0, "A", 2001),
        survey_row(4, "Araneus diadematus", RawValue::Int(4), 52.0, 1.0, "A", 2001),
        survey_row(5, "Amphiura filiformis", RawValue::Int(5), 53.0, 2.0, "B", 2001),
        survey_row(6, "Bufo bufo", RawValue::Int(0), 52.0, 1.0, "A", 2001),
        survey_row(7, "Bufo bufo", RawValue::Int(1), 52.0, -5.0, "A", 2001),
        survey_row(8, "sp.", RawValue::Int(1), 52.0, 1.0, "A", 2001),
        survey_row(9, "Rana temporaria", RawValue::Int(2), 52.5, 3.0, "C", 2002),
    ]
}

#[test]
fn test_report_accounts_for_every_row() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();
    let report = &output.report;

    assert_eq!(report.input_rows, 9);
    assert_eq!(report.dropped_rows(), 3);
    assert_eq!(report.dropped(RejectionKind::NonPositiveMeasurement), 1);
    assert_eq!(report.dropped(RejectionKind::CoordinatesOutOfRange), 1);
    assert_eq!(report.dropped(RejectionKind::UnparsableLabel), 1);
    assert_eq!(report.accepted_rows, 6);
    assert_eq!(report.pooled_rows, 0);
    assert_eq!(report.aggregated_rows, 1);
    assert_eq!(report.exported_rows, 5);
    assert_eq!(output.records.len(), 5);

    assert_eq!(report.input_rows, report.accepted_rows + report.dropped_rows());
    assert_eq!(
        report.exported_rows,
        report.accepted_rows - report.pooled_rows - report.aggregated_rows
    );
}

#[test]
fn test_duplicates_summed_and_morphospecies_kept() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    let araneus: Vec<_> = output
        .records
        .iter()
        .filter(|r| r.genus == "Araneus")
        .collect();
    assert_eq!(araneus.len(), 1);
    assert_eq!(araneus[0].abundance, Some(7.0));
    assert_eq!(araneus[0].sample_description, "ST1_A_52_1_15_6_2001");

    let lycosa: Vec<_> = output
        .records
        .iter()
        .filter(|r| r.genus == "Lycosa")
        .map(|r| r.species.as_str())
        .collect();
    assert_eq!(lycosa, vec!["sp1", "sp2"]);

    let total: f64 = output.records.iter().filter_map(|r| r.abundance).sum();
    assert_eq!(total, 3.0 + 2.0 + 1.0 + 4.0 + 5.0 + 2.0);
}

#[test]
fn test_export_sorted_by_year_then_taxon() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    let order: Vec<(Option<i32>, &str)> = output
        .records
        .iter()
        .map(|r| (r.year, r.genus.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (Some(2001), "Amphiura"),
            (Some(2001), "Araneus"),
            (Some(2001), "Lycosa"),
            (Some(2001), "Lycosa"),
            (Some(2002), "Rana"),
        ]
    );
}

#[test]
fn test_spatial_summary_over_exported_sites() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    let spatial = output.report.spatial.as_ref().unwrap();
    assert!(spatial.area_sq_km > 0.0);
    assert!((52.0..=53.0).contains(&spatial.central_latitude));
    assert!((1.0..=3.0).contains(&spatial.central_longitude));
    assert!(output.report.geometry_error.is_none());
}

#[test]
fn test_collinear_sites_recorded_as_geometry_error() {
    let rows = vec![
        survey_row(1, "Araneus diadematus", RawValue::Int(3), 52.0, 1.0, "A", 2001),
        survey_row(2, "Araneus diadematus", RawValue::Int(3), 53.0, 1.0, "B", 2001),
    ];
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(rows).unwrap();

    assert!(output.report.spatial.is_none());
    assert!(output.report.geometry_error.is_some());
    assert_eq!(output.records.len(), 2);
}

struct FixedEngine;

impl GeometryEngine for FixedEngine {
    fn summarize(&self, _points: &[(f64, f64)]) -> Result<SpatialSummary, GeometryError> {
        Ok(SpatialSummary {
            central_latitude: 10.0,
            central_longitude: 20.0,
            area_sq_km: 42.0,
        })
    }
}

#[test]
fn test_custom_geometry_engine() {
    let pipeline = CurationPipeline::new(survey_config())
        .unwrap()
        .with_spatial_summarizer(SpatialSummarizer::new(Box::new(FixedEngine)));
    let output = pipeline.run_records(survey_rows()).unwrap();

    assert_eq!(output.report.spatial.as_ref().unwrap().area_sq_km, 42.0);
}

#[test]
fn test_taxon_warnings_reach_report() {
    let config = survey_config().with_genus_correction("Aranaeus", "Araneus");
    let rows = vec![
        survey_row(1, "Aranaeus diadematus", RawValue::Int(3), 52.0, 1.0, "A", 2001),
        survey_row(2, "Lycosa cf. amentata", RawValue::Int(1), 52.0, 1.0, "A", 2001),
    ];

    let pipeline = CurationPipeline::new(config).unwrap();
    let output = pipeline.run_records(rows).unwrap();

    let kinds: Vec<(usize, WarningKind)> = output
        .report
        .warnings
        .iter()
        .map(|w| (w.row, w.kind))
        .collect();
    assert!(kinds.contains(&(1, WarningKind::GenusCorrected)));
    assert!(kinds.contains(&(2, WarningKind::OpenNomenclatureRemoved)));
    assert!(output.records.iter().any(|r| r.genus == "Araneus"));
}

#[test]
fn test_fields_cleared_after_keying() {
    let config = survey_config().with_clear_after_keying(Field::Plot);
    let pipeline = CurationPipeline::new(config).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    assert!(output.records.iter().all(|r| r.plot.is_none()));
    assert!(
        output
            .records
            .iter()
            .any(|r| r.sample_description == "ST1_A_52_1_15_6_2001")
    );
}

#[test]
fn test_pooled_rows_counted() {
    let config = survey_config().with_pool_field("Stage");
    let rows = vec![
        survey_row(1, "Bufo bufo", RawValue::Int(2), 52.0, 1.0, "A", 2001)
            .with_field("Stage", RawValue::Text("adult".to_string())),
        survey_row(2, "Bufo bufo", RawValue::Int(5), 52.0, 1.0, "A", 2001)
            .with_field("Stage", RawValue::Text("juvenile".to_string())),
    ];

    let pipeline = CurationPipeline::new(config).unwrap();
    let output = pipeline.run_records(rows).unwrap();

    assert_eq!(output.report.accepted_rows, 2);
    assert_eq!(output.report.pooled_rows, 1);
    assert_eq!(output.report.exported_rows, 1);
    assert_eq!(output.records[0].abundance, Some(7.0));
}

#[test]
fn test_invalid_config_rejected_up_front() {
    let config = crate::config::DatasetConfig::default();
    assert!(matches!(
        CurationPipeline::new(config),
        Err(CuratorError::Configuration { .. })
    ));
}

#[test]
fn test_run_frame_applies_schema_gate() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();

    let good = df!(
        "Count" => &[3i64, 1],
        "Taxon" => &["Araneus diadematus", "Lycosa sp1"],
        "Lat" => &[52.0f64, 52.0],
        "Long" => &[1.0f64, 1.0],
        "Site" => &["A", "A"],
        "Day" => &[15i64, 15],
        "Month" => &[6i64, 6],
        "Year" => &[2001i64, 2001],
    )
    .unwrap();
    let output = pipeline.run_frame(&good).unwrap();
    assert_eq!(output.records.len(), 2);

    let bad = good.drop("Lat").unwrap();
    match pipeline.run_frame(&bad) {
        Err(CuratorError::Structural { violations, .. }) => assert_eq!(violations.len(), 1),
        other => panic!("expected structural error, got {:?}", other.map(|o| o.report)),
    }
}

#[test]
fn test_run_frame_reads_categorical_columns() {
    let pipeline = CurationPipeline::new(survey_config()).unwrap();

    let mut df = df!(
        "Count" => &[3i64, 1],
        "Taxon" => &["Araneus diadematus", "Lycosa sp."],
        "Lat" => &[52.0f64, 52.0],
        "Long" => &[1.0f64, 1.0],
        "Site" => &["A", "A"],
        "Day" => &[15i64, 15],
        "Month" => &[6i64, 6],
        "Year" => &["2001", "2001"],
    )
    .unwrap();
    let categorical = DataType::Categorical(None, CategoricalOrdering::Physical);
    for name in ["Taxon", "Year"] {
        let cast = df.column(name).unwrap().cast(&categorical).unwrap();
        df.with_column(cast).unwrap();
    }

    let output = pipeline.run_frame(&df).unwrap();

    assert!(output.report.rejections.is_empty());
    let taxa: Vec<(&str, &str, Option<i32>)> = output
        .records
        .iter()
        .map(|r| (r.genus.as_str(), r.species.as_str(), r.year))
        .collect();
    assert_eq!(
        taxa,
        vec![
            ("Araneus", "diadematus", Some(2001)),
            ("Lycosa", "sp", Some(2001)),
        ]
    );
}

#[test]
fn test_distinct_morph_markers_not_summed() {
    let labels = [
        "Lycosa sp. 1a",
        "Lycosa sp. 1b",
        "Lycosa sp. A1",
        "Lycosa sp. A2",
        "Lycosa morph 1",
        "Lycosa morph 2",
        "Lycosa spA1",
    ];
    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| survey_row(i + 1, label, RawValue::Int(1), 52.0, 1.0, "A", 2001))
        .collect();

    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(rows).unwrap();

    let species: Vec<(&str, Option<f64>)> = output
        .records
        .iter()
        .map(|r| (r.species.as_str(), r.abundance))
        .collect();
    assert_eq!(
        species,
        vec![
            ("sp1", Some(1.0)),
            ("sp1A", Some(1.0)),
            ("sp1B", Some(1.0)),
            ("sp2", Some(1.0)),
            ("spA1", Some(2.0)),
            ("spA2", Some(1.0)),
        ]
    );
    assert_eq!(output.report.aggregated_rows, 1);
}

#[test]
fn test_descriptor_renames_merge_sampling_events() {
    let config = survey_config()
        .with_sample_key_fields(["study_id", "plot", "Treatment", "year"])
        .with_secondary_rename("Controll", "Control");
    let rows = vec![
        survey_row(1, "Bufo bufo", RawValue::Int(2), 52.0, 1.0, "A", 2001)
            .with_field("Treatment", RawValue::Text("Control".to_string())),
        survey_row(2, "Bufo bufo", RawValue::Int(3), 52.0, 1.0, "A", 2001)
            .with_field("Treatment", RawValue::Text("Controll".to_string())),
    ];

    let pipeline = CurationPipeline::new(config).unwrap();
    let output = pipeline.run_records(rows).unwrap();

    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].sample_description, "ST1_A_Control_2001");
    assert_eq!(output.records[0].abundance, Some(5.0));
    assert!(
        output
            .report
            .warnings
            .iter()
            .any(|w| w.row == 2 && w.kind == WarningKind::SecondaryValueRenamed)
    );
}

#[test]
fn test_staged_outputs_discarded_without_commit() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    let staged = pipeline.stage_outputs(&output, temp_dir.path()).unwrap();
    assert!(!temp_dir.path().join("ST1.csv").exists());
    assert!(!temp_dir.path().join("ST1.report.json").exists());

    drop(staged);
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_write_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = CurationPipeline::new(survey_config()).unwrap();
    let output = pipeline.run_records(survey_rows()).unwrap();

    let written = pipeline.write_outputs(&output, temp_dir.path()).unwrap();

    assert_eq!(written.export, temp_dir.path().join("ST1.csv"));
    assert_eq!(written.report, temp_dir.path().join("ST1.report.json"));
    assert_eq!(
        written.metadata,
        Some(temp_dir.path().join("ST1.metadata.json"))
    );

    let csv = std::fs::read_to_string(&written.export).unwrap();
    assert_eq!(csv.lines().count(), 6);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written.report).unwrap()).unwrap();
    assert_eq!(report["input_rows"], 9);
    assert_eq!(report["exported_rows"], 5);
    assert_eq!(report["dropped_by_reason"]["unparsable_label"], 1);

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written.metadata.unwrap()).unwrap())
            .unwrap();
    assert!(metadata["areaSqKm"].as_f64().unwrap() > 0.0);

    // Only the three artifacts, no staging leftovers
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 3);
}
