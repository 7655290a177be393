//! Event-level aggregation of keyed records
//!
//! Records describing the same species in the same sampling event are merged
//! by summing their measurements. After merging, the (sample, family, genus,
//! species) identity must be unique; anything else is a defect in the
//! pipeline, not in the data.

use crate::error::{CuratorError, Result};
use crate::models::{KeyedRecord, sum_measurements};
use std::collections::HashMap;
use tracing::{debug, info};

/// Aggregated records plus the number of rows merged away
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub records: Vec<KeyedRecord>,
    pub merged: usize,
}

/// Owned form of [`KeyedRecord::identity`] for use as a map key
type Identity = (String, String, String, String);

fn owned_identity(record: &KeyedRecord) -> Identity {
    let (key, family, genus, species) = record.identity();
    (
        key.to_string(),
        family.to_string(),
        genus.to_string(),
        species.to_string(),
    )
}

/// Merge records sharing a sampling event and taxon
///
/// The first record of each group is kept as the representative and the
/// measurements of later members are added to it. Group order follows the
/// first appearance of each identity in the input.
///
/// # Arguments
///
/// * `records` - Keyed records in pipeline order
///
/// # Returns
///
/// The merged records and the count of rows folded into a representative
pub fn aggregate(records: Vec<KeyedRecord>) -> AggregationOutcome {
    let input_count = records.len();
    let mut merged_records: Vec<KeyedRecord> = Vec::with_capacity(input_count);
    let mut index: HashMap<Identity, usize> = HashMap::with_capacity(input_count);

    for record in records {
        let identity = owned_identity(&record);
        match index.get(&identity) {
            Some(&position) => {
                let representative = &mut merged_records[position];
                representative.record.abundance =
                    sum_measurements(representative.record.abundance, record.record.abundance);
                representative.record.biomass =
                    sum_measurements(representative.record.biomass, record.record.biomass);
                debug!(
                    "Merged row {} into row {} ({} @ {})",
                    record.record.row,
                    representative.record.row,
                    representative.taxon,
                    representative.sample_key
                );
            }
            None => {
                index.insert(identity, merged_records.len());
                merged_records.push(record);
            }
        }
    }

    let merged = input_count - merged_records.len();
    info!(
        "Aggregation complete: {} -> {} records ({} merged)",
        input_count,
        merged_records.len(),
        merged
    );

    AggregationOutcome {
        records: merged_records,
        merged,
    }
}

/// Verify that every (sample, family, genus, species) tuple occurs once
pub fn verify_unique(records: &[KeyedRecord], dataset: &str) -> Result<()> {
    let (_, duplicate_groups, total_duplicates) = count_identity_groups(records);
    if duplicate_groups == 0 {
        return Ok(());
    }

    let mut seen: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    let example = records
        .iter()
        .find(|record| {
            let count = seen.entry(record.identity()).or_insert(0);
            *count += 1;
            *count > 1
        })
        .map(|record| format!("{} @ {}", record.taxon, record.sample_key))
        .unwrap_or_default();

    Err(CuratorError::AggregationInvariantViolation {
        dataset: dataset.to_string(),
        duplicates: total_duplicates,
        example,
    })
}

/// Count identity groups in a record set
///
/// # Returns
///
/// Tuple of (total_groups, duplicate_groups, total_duplicates)
pub fn count_identity_groups(records: &[KeyedRecord]) -> (usize, usize, usize) {
    let mut groups: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    for record in records {
        *groups.entry(record.identity()).or_insert(0) += 1;
    }

    let total_groups = groups.len();
    let duplicate_groups = groups.values().filter(|&&count| count > 1).count();
    let total_duplicates = groups.values().map(|&count| count.saturating_sub(1)).sum();

    (total_groups, duplicate_groups, total_duplicates)
}
