//! Tests for event-level aggregation and the uniqueness invariant

use super::super::aggregation::{aggregate, count_identity_groups, verify_unique};
use super::keyed;
use crate::error::CuratorError;
use crate::models::KeyedRecord;

fn total_abundance(records: &[KeyedRecord]) -> f64 {
    records.iter().filter_map(|r| r.record.abundance).sum()
}

fn sample() -> Vec<KeyedRecord> {
    vec![
        keyed(1, "S1", "Araneus", "diadematus", 2.0),
        keyed(2, "S1", "Lycosa", "sp1", 1.0),
        keyed(3, "S1", "Araneus", "diadematus", 5.0),
        keyed(4, "S2", "Araneus", "diadematus", 4.0),
        keyed(5, "S1", "Lycosa", "sp2", 3.0),
    ]
}

#[test]
fn test_duplicates_summed_in_first_seen_order() {
    let outcome = aggregate(sample());

    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.merged, 1);

    let first = &outcome.records[0];
    assert_eq!(first.record.row, 1);
    assert_eq!(first.record.abundance, Some(7.0));
    assert_eq!(
        outcome
            .records
            .iter()
            .map(|r| r.record.row)
            .collect::<Vec<_>>(),
        vec![1, 2, 4, 5]
    );
}

#[test]
fn test_abundance_conserved() {
    let input = sample();
    let before = total_abundance(&input);
    let outcome = aggregate(input);
    assert_eq!(total_abundance(&outcome.records), before);
}

#[test]
fn test_aggregation_is_idempotent() {
    let once = aggregate(sample());
    let twice = aggregate(once.records.clone());

    assert_eq!(twice.merged, 0);
    assert_eq!(twice.records, once.records);
}

#[test]
fn test_morphospecies_stay_distinct() {
    let outcome = aggregate(sample());
    let lycosa: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.taxon.genus == "Lycosa")
        .map(|r| r.taxon.species.as_str())
        .collect();
    assert_eq!(lycosa, vec!["sp1", "sp2"]);
}

#[test]
fn test_blank_measurements_stay_blank() {
    let mut first = keyed(1, "S1", "Araneus", "diadematus", 2.0);
    let mut second = keyed(2, "S1", "Araneus", "diadematus", 3.0);
    first.record.biomass = None;
    second.record.biomass = Some(0.5);

    let outcome = aggregate(vec![first.clone(), second]);
    assert_eq!(outcome.records[0].record.biomass, Some(0.5));

    let mut third = first.clone();
    third.record.row = 3;
    let outcome = aggregate(vec![first, third]);
    assert_eq!(outcome.records[0].record.biomass, None);
}

#[test]
fn test_verify_unique() {
    let outcome = aggregate(sample());
    assert!(verify_unique(&outcome.records, "test").is_ok());

    let result = verify_unique(&sample(), "test");
    match result {
        Err(CuratorError::AggregationInvariantViolation {
            dataset,
            duplicates,
            example,
        }) => {
            assert_eq!(dataset, "test");
            assert_eq!(duplicates, 1);
            assert!(example.contains("Araneus diadematus"));
        }
        other => panic!("expected invariant violation, got {:?}", other),
    }
}

#[test]
fn test_count_identity_groups() {
    let (groups, duplicate_groups, duplicates) = count_identity_groups(&sample());
    assert_eq!(groups, 4);
    assert_eq!(duplicate_groups, 1);
    assert_eq!(duplicates, 1);
}
