//! Sample identity keys
//!
//! A sample key identifies one sampling event: the values of the configured
//! descriptor fields joined with `_`. Which fields take part is decided once
//! per dataset, so every record's key has the same shape.

use crate::config::DatasetConfig;
use crate::constants::SAMPLE_KEY_SEPARATOR;
use crate::models::{Field, ValidatedRecord, format_number};
use tracing::{debug, info};

/// One descriptor that can contribute to a sample key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyField {
    StudyId,
    Plot,
    Latitude,
    Longitude,
    Depth,
    Day,
    Month,
    Year,
    /// Any other source column, carried as a record descriptor
    Source(String),
}

impl KeyField {
    /// Resolve a configured field name; source columns mapped to a role resolve to that role
    pub fn parse(name: &str, config: &DatasetConfig) -> Self {
        match name {
            "study_id" => return KeyField::StudyId,
            "plot" => return KeyField::Plot,
            "latitude" => return KeyField::Latitude,
            "longitude" => return KeyField::Longitude,
            "depth" => return KeyField::Depth,
            "day" => return KeyField::Day,
            "month" => return KeyField::Month,
            "year" => return KeyField::Year,
            _ => {}
        }

        let mapped = config
            .columns
            .iter()
            .find(|(_, column)| *column == name)
            .map(|(field, _)| field);

        match mapped {
            Some(Field::Plot) => KeyField::Plot,
            Some(Field::Latitude) => KeyField::Latitude,
            Some(Field::Longitude) => KeyField::Longitude,
            Some(Field::Depth) => KeyField::Depth,
            Some(Field::Day) => KeyField::Day,
            Some(Field::Month) => KeyField::Month,
            Some(Field::Year) => KeyField::Year,
            _ => KeyField::Source(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            KeyField::StudyId => "study_id",
            KeyField::Plot => "plot",
            KeyField::Latitude => "latitude",
            KeyField::Longitude => "longitude",
            KeyField::Depth => "depth",
            KeyField::Day => "day",
            KeyField::Month => "month",
            KeyField::Year => "year",
            KeyField::Source(column) => column,
        }
    }

    /// The record's value for this field, `None` when blank
    pub fn value(&self, record: &ValidatedRecord, study_id: Option<&str>) -> Option<String> {
        match self {
            KeyField::StudyId => study_id.map(str::to_string),
            KeyField::Plot => record.plot.clone(),
            KeyField::Latitude => Some(format_number(record.latitude)),
            KeyField::Longitude => Some(format_number(record.longitude)),
            KeyField::Depth => record.depth.clone(),
            KeyField::Day => record.day.map(|d| d.to_string()),
            KeyField::Month => record.month.map(|m| m.to_string()),
            KeyField::Year => record.year.map(|y| y.to_string()),
            KeyField::Source(column) => record.descriptors.get(column).cloned(),
        }
        .filter(|value| !value.is_empty())
    }
}

/// Builds sample keys over the fields populated somewhere in the dataset
#[derive(Debug, Clone)]
pub struct SampleKeyBuilder {
    active: Vec<KeyField>,
    study_id: Option<String>,
}

impl SampleKeyBuilder {
    /// Decide the active key fields from the whole dataset
    pub fn plan(config: &DatasetConfig, records: &[ValidatedRecord]) -> Self {
        let study_id = config.study_id.clone().filter(|id| !id.trim().is_empty());

        let mut active = Vec::new();
        for name in &config.rules.sample_key_fields {
            let field = KeyField::parse(name, config);
            if active.contains(&field) {
                continue;
            }

            let populated = records
                .iter()
                .any(|record| field.value(record, study_id.as_deref()).is_some());
            if populated {
                active.push(field);
            } else {
                debug!("Sample key field '{}' is blank for every record, skipping", name);
            }
        }

        info!(
            "Sample key fields: [{}]",
            active
                .iter()
                .map(KeyField::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self { active, study_id }
    }

    /// Join the record's active field values; blanks become empty components
    pub fn build(&self, record: &ValidatedRecord) -> String {
        let mut parts: Vec<String> = self
            .active
            .iter()
            .map(|field| {
                field
                    .value(record, self.study_id.as_deref())
                    .unwrap_or_default()
            })
            .collect();

        parts.extend(record.retained_pool_values.iter().cloned());
        parts.join(SAMPLE_KEY_SEPARATOR)
    }

    pub fn active_field_names(&self) -> Vec<String> {
        self.active.iter().map(|f| f.name().to_string()).collect()
    }
}

/// Blank the configured fields once the key no longer needs them
pub fn clear_fields(record: &mut ValidatedRecord, fields: &[Field]) {
    for field in fields {
        match field {
            Field::Plot => record.plot = None,
            Field::Depth => record.depth = None,
            Field::Day => record.day = None,
            Field::Month => record.month = None,
            Field::Year => record.year = None,
            _ => {}
        }
    }
}
