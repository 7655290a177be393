//! Pooling over secondary subdivisions
//!
//! Some datasets record life stages or sexes as separate rows that should
//! be summed into one observation. Records are grouped by every field
//! except the measurements and the pool fields, and their measurements are
//! summed. Exempt taxa pass through unpooled and keep their pool-field
//! values so later stages can keep their subdivisions apart.

use crate::models::{ValidatedRecord, sum_measurements};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Everything that identifies a record apart from measurements and pool fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    taxon_label: String,
    family_label: Option<String>,
    latitude: u64,
    longitude: u64,
    plot: Option<String>,
    depth: Option<String>,
    day: Option<u32>,
    month: Option<u32>,
    year: Option<i32>,
    descriptors: Vec<(String, String)>,
}

impl PoolKey {
    fn new(record: &ValidatedRecord, pool_fields: &BTreeSet<String>) -> Self {
        Self {
            taxon_label: record.taxon_label.clone(),
            family_label: record.family_label.clone(),
            latitude: record.latitude.to_bits(),
            longitude: record.longitude.to_bits(),
            plot: record.plot.clone(),
            depth: record.depth.clone(),
            day: record.day,
            month: record.month,
            year: record.year,
            descriptors: record
                .descriptors
                .iter()
                .filter(|(column, _)| !pool_fields.contains(*column))
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Sum measurements across pool fields, preserving first-seen order
pub fn pool_records(
    records: Vec<ValidatedRecord>,
    pool_fields: &BTreeSet<String>,
    exempt_taxa: &BTreeSet<String>,
) -> Vec<ValidatedRecord> {
    if pool_fields.is_empty() {
        return records;
    }

    let mut pooled: Vec<ValidatedRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<PoolKey, usize> = HashMap::new();

    for mut record in records {
        if exempt_taxa.contains(record.taxon_label.trim()) {
            record.retained_pool_values = pool_fields
                .iter()
                .map(|field| record.descriptors.get(field).cloned().unwrap_or_default())
                .collect();
            pooled.push(record);
            continue;
        }

        let key = PoolKey::new(&record, pool_fields);
        match index.get(&key) {
            Some(&position) => {
                let target = &mut pooled[position];
                target.abundance = sum_measurements(target.abundance, record.abundance);
                target.biomass = sum_measurements(target.biomass, record.biomass);
                target.pooled_rows += record.pooled_rows;
                debug!(
                    "Pooled row {} into row {} ({})",
                    record.row, target.row, target.taxon_label
                );
            }
            None => {
                for field in pool_fields {
                    record.descriptors.remove(field);
                }
                index.insert(key, pooled.len());
                pooled.push(record);
            }
        }
    }

    pooled
}
