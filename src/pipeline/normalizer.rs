//! Field coercion and primary-field sanity rules
//!
//! Turns untyped rows into [`ValidatedRecord`]s. Rules run in a fixed order
//! and the first failure drops the record with its reason; one bad row
//! never aborts the batch.

use crate::config::DatasetConfig;
use crate::constants::{MAX_YEAR, MIN_YEAR};
use crate::models::{Field, RawRecord, RawValue, ValidatedRecord};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::pooling::pool_records;
use super::report::{Rejection, RejectionKind, ReviewWarning, WarningKind};

/// Result of normalizing a batch of raw records
#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    pub accepted: Vec<ValidatedRecord>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<ReviewWarning>,
    /// Rows merged away by pooling
    pub pooled_rows: usize,
}

/// Applies coercion and field rules for one dataset
#[derive(Debug)]
pub struct FieldNormalizer<'a> {
    config: &'a DatasetConfig,
    primary: Field,
    secondary_measurement: Option<Field>,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(config: &'a DatasetConfig) -> Self {
        let primary = config.primary_measurement();
        let secondary = match primary {
            Field::Abundance => Field::Biomass,
            _ => Field::Abundance,
        };
        let secondary_measurement = config.columns.contains(secondary).then_some(secondary);

        Self {
            config,
            primary,
            secondary_measurement,
        }
    }

    /// Normalize every record, then pool when pool fields are configured
    pub fn normalize(&self, records: Vec<RawRecord>) -> NormalizationOutcome {
        let total = records.len();
        let mut outcome = NormalizationOutcome::default();

        for raw in &records {
            match self.normalize_record(raw, &mut outcome.warnings) {
                Ok(record) => outcome.accepted.push(record),
                Err(rejection) => {
                    debug!(
                        "Row {} rejected: {} ({})",
                        rejection.row, rejection.kind, rejection.detail
                    );
                    outcome.rejected.push(rejection);
                }
            }
        }

        let rules = &self.config.rules;
        if !rules.pool_fields.is_empty() {
            let before = outcome.accepted.len();
            outcome.accepted = pool_records(
                std::mem::take(&mut outcome.accepted),
                &rules.pool_fields,
                &rules.pool_exempt_taxa,
            );
            outcome.pooled_rows = before - outcome.accepted.len();
        }

        info!(
            "Field normalization complete: {} -> {} records ({} rejected, {} pooled)",
            total,
            outcome.accepted.len(),
            outcome.rejected.len(),
            outcome.pooled_rows
        );

        outcome
    }

    /// Apply the field rules to one record, stopping at the first failure
    pub fn normalize_record(
        &self,
        raw: &RawRecord,
        warnings: &mut Vec<ReviewWarning>,
    ) -> Result<ValidatedRecord, Rejection> {
        let row = raw.row;

        let primary = self.primary_measurement(raw)?;
        let secondary = self.secondary_measurement(raw)?;
        let (abundance, biomass) = match self.primary {
            Field::Abundance => (Some(primary), secondary),
            _ => (secondary, Some(primary)),
        };

        let (latitude, longitude) = self.coordinates(raw)?;

        let year = self
            .calendar_value(raw, Field::Year)?
            .map(|y| {
                i32::try_from(y)
                    .ok()
                    .filter(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
                    .ok_or_else(|| {
                        Rejection::new(row, RejectionKind::InvalidDate, format!("year {y}"))
                    })
            })
            .transpose()?;
        let month = self
            .calendar_value(raw, Field::Month)?
            .map(|m| {
                u32::try_from(m)
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| {
                        Rejection::new(row, RejectionKind::InvalidDate, format!("month {m}"))
                    })
            })
            .transpose()?;
        let day = self
            .calendar_value(raw, Field::Day)?
            .map(|d| {
                u32::try_from(d)
                    .ok()
                    .filter(|d| is_valid_day(*d, month, year))
                    .ok_or_else(|| {
                        Rejection::new(row, RejectionKind::InvalidDate, format!("day {d}"))
                    })
            })
            .transpose()?;

        let plot = self.secondary_value(raw, Field::Plot, warnings)?;
        let depth = self.secondary_value(raw, Field::Depth, warnings)?;
        let descriptors = self.unmapped_descriptors(raw, warnings);

        Ok(ValidatedRecord {
            row,
            abundance,
            biomass,
            taxon_label: self.taxon_label(raw),
            family_label: self.text(raw, Field::Family),
            latitude,
            longitude,
            plot,
            depth,
            day,
            month,
            year,
            descriptors,
            retained_pool_values: Vec::new(),
            pooled_rows: 1,
        })
    }

    fn primary_measurement(&self, raw: &RawRecord) -> Result<f64, Rejection> {
        let column = self.config.column(self.primary).unwrap_or_default();
        match raw.get(column).as_f64() {
            Ok(None) => Err(Rejection::new(
                raw.row,
                RejectionKind::MissingMeasurement,
                format!("{} is blank", self.primary),
            )),
            Err(text) => Err(Rejection::new(
                raw.row,
                RejectionKind::InvalidMeasurement,
                format!("{} '{}' is not numeric", self.primary, text),
            )),
            Ok(Some(value)) => check_positive(raw.row, self.primary, value),
        }
    }

    fn secondary_measurement(&self, raw: &RawRecord) -> Result<Option<f64>, Rejection> {
        let Some(field) = self.secondary_measurement else {
            return Ok(None);
        };
        let column = self.config.column(field).unwrap_or_default();
        match raw.get(column).as_f64() {
            Ok(None) => Ok(None),
            Err(text) => Err(Rejection::new(
                raw.row,
                RejectionKind::InvalidMeasurement,
                format!("{} '{}' is not numeric", field, text),
            )),
            Ok(Some(value)) => check_positive(raw.row, field, value).map(Some),
        }
    }

    fn coordinates(&self, raw: &RawRecord) -> Result<(f64, f64), Rejection> {
        if let Some(fixed) = self.config.rules.fixed_coordinates {
            return Ok(fixed);
        }

        let mut values = [0.0; 2];
        for (slot, field) in values.iter_mut().zip([Field::Latitude, Field::Longitude]) {
            let column = self.config.column(field).unwrap_or_default();
            *slot = match raw.get(column).as_f64() {
                Ok(Some(value)) if value.is_finite() => value,
                Ok(Some(_)) | Err(_) => {
                    return Err(Rejection::new(
                        raw.row,
                        RejectionKind::InvalidCoordinates,
                        format!("{} is not a number", field),
                    ));
                }
                Ok(None) => {
                    return Err(Rejection::new(
                        raw.row,
                        RejectionKind::MissingCoordinates,
                        format!("{} is blank", field),
                    ));
                }
            };
        }

        let [latitude, longitude] = values;
        let range = self.config.rules.longitude_range;
        if !(-90.0..=90.0).contains(&latitude) || !range.contains(longitude) {
            let (min, max) = range.bounds();
            return Err(Rejection::new(
                raw.row,
                RejectionKind::CoordinatesOutOfRange,
                format!(
                    "({latitude}, {longitude}) outside latitude [-90, 90] / longitude [{min}, {max}]"
                ),
            ));
        }

        Ok((latitude, longitude))
    }

    /// Integer value of a temporal field; blank is `None`
    fn calendar_value(&self, raw: &RawRecord, field: Field) -> Result<Option<i64>, Rejection> {
        let Some(column) = self.config.column(field) else {
            return Ok(None);
        };
        parse_calendar_value(raw.get(column), field == Field::Month).map_err(|text| {
            Rejection::new(
                raw.row,
                RejectionKind::InvalidDate,
                format!("{} '{}' is not a whole number", field, text),
            )
        })
    }

    fn secondary_value(
        &self,
        raw: &RawRecord,
        field: Field,
        warnings: &mut Vec<ReviewWarning>,
    ) -> Result<Option<String>, Rejection> {
        let value = self
            .text(raw, field)
            .map(|current| self.renamed(raw.row, &field.to_string(), current, warnings));

        let required = self.config.rules.required_secondary_fields.contains(&field);
        if required && value.as_deref().is_none_or(str::is_empty) {
            return Err(Rejection::new(
                raw.row,
                RejectionKind::UnrecoverableSecondaryField,
                format!("{} is blank", field),
            ));
        }

        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Apply the secondary rename table to one descriptor value
    fn renamed(
        &self,
        row: usize,
        descriptor: &str,
        current: String,
        warnings: &mut Vec<ReviewWarning>,
    ) -> String {
        match self.config.secondary_field_renames.get(&current) {
            Some(renamed) => {
                warnings.push(ReviewWarning::new(
                    row,
                    WarningKind::SecondaryValueRenamed,
                    format!("{} '{}' -> '{}'", descriptor, current, renamed),
                ));
                renamed.clone()
            }
            None => current,
        }
    }

    fn text(&self, raw: &RawRecord, field: Field) -> Option<String> {
        self.config
            .column(field)
            .and_then(|column| raw.get(column).as_text())
    }

    /// Taxon label from the taxon column, or genus and species columns joined
    fn taxon_label(&self, raw: &RawRecord) -> String {
        if let Some(label) = self.text(raw, Field::Taxon) {
            return label;
        }

        let genus = self.text(raw, Field::Genus).unwrap_or_default();
        let species = self.text(raw, Field::Species).unwrap_or_default();

        // Species columns sometimes repeat the genus ("Genus species")
        let epithet = match species.split_once(char::is_whitespace) {
            Some((first, rest)) if !genus.is_empty() && first.eq_ignore_ascii_case(&genus) => {
                rest.trim().to_string()
            }
            _ => species,
        };

        format!("{} {}", genus, epithet).trim().to_string()
    }

    /// Columns outside the canonical mapping, with secondary renames applied
    fn unmapped_descriptors(
        &self,
        raw: &RawRecord,
        warnings: &mut Vec<ReviewWarning>,
    ) -> BTreeMap<String, String> {
        raw.fields
            .iter()
            .filter(|(column, _)| {
                !self
                    .config
                    .columns
                    .iter()
                    .any(|(_, mapped)| mapped == column.as_str())
            })
            .map(|(column, value)| {
                let text = value.as_text().unwrap_or_default();
                let text = self.renamed(raw.row, column, text, warnings);
                (column.clone(), text)
            })
            .collect()
    }
}

fn check_positive(row: usize, field: Field, value: f64) -> Result<f64, Rejection> {
    if !value.is_finite() {
        return Err(Rejection::new(
            row,
            RejectionKind::InvalidMeasurement,
            format!("{} {} is not finite", field, value),
        ));
    }
    if value <= 0.0 {
        return Err(Rejection::new(
            row,
            RejectionKind::NonPositiveMeasurement,
            format!("{} {} is not positive", field, value),
        ));
    }
    Ok(value)
}

/// Coerce a temporal cell to a whole number; month names are accepted for months
pub fn parse_calendar_value(
    value: &RawValue,
    allow_month_name: bool,
) -> std::result::Result<Option<i64>, String> {
    if value.is_blank() {
        return Ok(None);
    }
    match value {
        RawValue::Null => Ok(None),
        RawValue::Int(v) => Ok(Some(*v)),
        RawValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(*v as i64)),
        RawValue::Float(v) => Err(v.to_string()),
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                return Ok(Some(v));
            }
            if let Ok(v) = trimmed.parse::<f64>() {
                if v.fract() == 0.0 && v.is_finite() {
                    return Ok(Some(v as i64));
                }
            }
            if allow_month_name {
                if let Some(month) = month_from_name(trimmed) {
                    return Ok(Some(month));
                }
            }
            Err(trimmed.to_string())
        }
    }
}

fn month_from_name(name: &str) -> Option<i64> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as i64 + 1)
}

/// Day validity, checked against the month (and year, for leap days) when known
fn is_valid_day(day: u32, month: Option<u32>, year: Option<i32>) -> bool {
    match month {
        // 2000 is a leap year, so an unknown year never rejects 29 February
        Some(month) => NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, day).is_some(),
        None => (1..=31).contains(&day),
    }
}
