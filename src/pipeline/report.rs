//! End-of-run curation report
//!
//! Every dropped record and every flagged-but-kept record is accumulated
//! here so curators see the full picture of a run, not just the first
//! problem. The report is serialized next to the export.

use crate::models::SpatialSummary;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MissingMeasurement,
    InvalidMeasurement,
    NonPositiveMeasurement,
    MissingCoordinates,
    InvalidCoordinates,
    CoordinatesOutOfRange,
    InvalidDate,
    UnrecoverableSecondaryField,
    UnparsableLabel,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectionKind::MissingMeasurement => "missing measurement",
            RejectionKind::InvalidMeasurement => "invalid measurement",
            RejectionKind::NonPositiveMeasurement => "non-positive measurement",
            RejectionKind::MissingCoordinates => "missing coordinates",
            RejectionKind::InvalidCoordinates => "invalid coordinates",
            RejectionKind::CoordinatesOutOfRange => "coordinates out of range",
            RejectionKind::InvalidDate => "invalid date",
            RejectionKind::UnrecoverableSecondaryField => "unrecoverable secondary field",
            RejectionKind::UnparsableLabel => "unparsable taxon label",
        };
        f.write_str(name)
    }
}

/// A dropped record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub row: usize,
    pub kind: RejectionKind,
    pub detail: String,
}

impl Rejection {
    pub fn new(row: usize, kind: RejectionKind, detail: impl Into<String>) -> Self {
        Self {
            row,
            kind,
            detail: detail.into(),
        }
    }
}

/// Kinds of flagged-but-retained anomalies for curator review
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A family name was supplied where a genus was expected
    FamilyInGenusPosition,
    GenusCorrected,
    /// `cf.` / `aff.` markers removed from a label
    OpenNomenclatureRemoved,
    InfraspecificRankDropped,
    SecondaryValueRenamed,
}

/// A record kept in the output but flagged for review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewWarning {
    pub row: usize,
    pub kind: WarningKind,
    pub detail: String,
}

impl ReviewWarning {
    pub fn new(row: usize, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            row,
            kind,
            detail: detail.into(),
        }
    }
}

/// Statistics and findings for one dataset run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurationReport {
    pub dataset: String,
    /// Rows in the contributor table
    pub input_rows: usize,
    /// Rows passing field normalization and taxon parsing
    pub accepted_rows: usize,
    /// Rows merged away by pooling
    pub pooled_rows: usize,
    /// Rows merged away by event-level aggregation
    pub aggregated_rows: usize,
    pub exported_rows: usize,
    /// Descriptor fields that made up the sample key
    pub sample_key_fields: Vec<String>,
    pub dropped_by_reason: BTreeMap<RejectionKind, usize>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<ReviewWarning>,
    pub spatial: Option<SpatialSummary>,
    pub geometry_error: Option<String>,
}

impl CurationReport {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Default::default()
        }
    }

    /// Record a dropped row
    pub fn add_rejection(&mut self, rejection: Rejection) {
        *self.dropped_by_reason.entry(rejection.kind).or_insert(0) += 1;
        self.rejections.push(rejection);
    }

    pub fn add_warning(&mut self, warning: ReviewWarning) {
        self.warnings.push(warning);
    }

    pub fn dropped_rows(&self) -> usize {
        self.rejections.len()
    }

    pub fn dropped(&self, kind: RejectionKind) -> usize {
        self.dropped_by_reason.get(&kind).copied().unwrap_or(0)
    }

    /// Percentage of input rows that survived validation
    pub fn acceptance_rate(&self) -> f64 {
        if self.input_rows == 0 {
            100.0
        } else {
            (self.accepted_rows as f64 / self.input_rows as f64) * 100.0
        }
    }

    /// Get summary of the run for logging
    pub fn summary(&self) -> String {
        let reasons = if self.dropped_by_reason.is_empty() {
            "none".to_string()
        } else {
            self.dropped_by_reason
                .iter()
                .map(|(kind, count)| format!("{kind}: {count}"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "{}: {} input -> {} accepted ({:.1}%) -> {} exported | \
             Dropped: {} ({}) | Pooled: {} | Aggregated: {} | Warnings: {}",
            self.dataset,
            self.input_rows,
            self.accepted_rows,
            self.acceptance_rate(),
            self.exported_rows,
            self.dropped_rows(),
            reasons,
            self.pooled_rows,
            self.aggregated_rows,
            self.warnings.len()
        )
    }
}
