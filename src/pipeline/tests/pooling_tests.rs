//! Tests for pooling over secondary subdivisions

use super::super::normalizer::FieldNormalizer;
use super::super::pooling::pool_records;
use super::{survey_config, survey_row, text, validated};
use crate::models::{RawValue, ValidatedRecord};
use std::collections::BTreeSet;

fn staged(row: usize, taxon: &str, abundance: f64, stage: &str) -> ValidatedRecord {
    let mut record = validated(row, taxon, abundance);
    record
        .descriptors
        .insert("Stage".to_string(), stage.to_string());
    record
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_life_stages_summed() {
    let records = vec![
        staged(1, "Bufo bufo", 3.0, "adult"),
        staged(2, "Bufo bufo", 10.0, "juvenile"),
        staged(3, "Rana temporaria", 1.0, "adult"),
    ];

    let pooled = pool_records(records, &set(&["Stage"]), &BTreeSet::new());

    assert_eq!(pooled.len(), 2);
    assert_eq!(pooled[0].taxon_label, "Bufo bufo");
    assert_eq!(pooled[0].abundance, Some(13.0));
    assert_eq!(pooled[0].pooled_rows, 2);
    assert!(!pooled[0].descriptors.contains_key("Stage"));
    assert_eq!(pooled[1].taxon_label, "Rana temporaria");
    assert_eq!(pooled[1].pooled_rows, 1);
}

#[test]
fn test_distinct_events_not_pooled() {
    let mut other_year = staged(2, "Bufo bufo", 10.0, "juvenile");
    other_year.year = Some(2002);

    let pooled = pool_records(
        vec![staged(1, "Bufo bufo", 3.0, "adult"), other_year],
        &set(&["Stage"]),
        &BTreeSet::new(),
    );

    assert_eq!(pooled.len(), 2);
    assert!(pooled.iter().all(|r| r.pooled_rows == 1));
}

#[test]
fn test_exempt_taxa_keep_pool_values() {
    let records = vec![
        staged(1, "Bufo bufo", 3.0, "adult"),
        staged(2, "Bufo bufo", 10.0, "juvenile"),
    ];

    let pooled = pool_records(records, &set(&["Stage"]), &set(&["Bufo bufo"]));

    assert_eq!(pooled.len(), 2);
    assert_eq!(pooled[0].retained_pool_values, vec!["adult"]);
    assert_eq!(pooled[1].retained_pool_values, vec!["juvenile"]);
}

#[test]
fn test_blank_biomass_stays_blank() {
    let records = vec![
        staged(1, "Bufo bufo", 3.0, "adult"),
        staged(2, "Bufo bufo", 4.0, "juvenile"),
    ];

    let pooled = pool_records(records, &set(&["Stage"]), &BTreeSet::new());
    assert_eq!(pooled[0].biomass, None);
    assert_eq!(pooled[0].abundance, Some(7.0));
}

#[test]
fn test_no_pool_fields_is_passthrough() {
    let records = vec![validated(1, "Bufo bufo", 1.0), validated(2, "Bufo bufo", 2.0)];
    let pooled = pool_records(records.clone(), &BTreeSet::new(), &BTreeSet::new());
    assert_eq!(pooled, records);
}

#[test]
fn test_normalizer_reports_pooled_rows() {
    let config = survey_config().with_pool_field("Stage");
    let rows = vec![
        survey_row(1, "Bufo bufo", RawValue::Int(2), 52.0, 1.0, "A", 2001)
            .with_field("Stage", text("adult")),
        survey_row(2, "Bufo bufo", RawValue::Int(5), 52.0, 1.0, "A", 2001)
            .with_field("Stage", text("tadpole")),
    ];

    let outcome = FieldNormalizer::new(&config).normalize(rows);

    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.accepted[0].abundance, Some(7.0));
    assert_eq!(outcome.pooled_rows, 1);
}
