//! Curation pipeline for contributed survey datasets
//!
//! Data flows strictly forward through the stages:
//!
//! - schema gate ([`crate::schema::SchemaValidator`])
//! - [`normalizer`] - type coercion, field rules, optional pooling
//! - [`taxonomy`] - taxon label decomposition and correction
//! - [`sample_key`] - sampling-event identity
//! - [`aggregation`] - event-level merging and the uniqueness check
//! - [`export`] - canonical projection and serialization
//!
//! followed by the spatial summary over the exported locations. Every
//! stage reports into a single [`report::CurationReport`].

pub mod aggregation;
pub mod export;
pub mod normalizer;
pub mod pooling;
pub mod report;
pub mod sample_key;
pub mod taxonomy;

#[cfg(test)]
mod tests;

use crate::config::DatasetConfig;
use crate::constants::REPORT_SUFFIX;
use crate::error::{CuratorError, Result};
use crate::models::{CanonicalRecord, KeyedRecord, RawRecord};
use crate::reader::{read_table, records_from_frame};
use crate::schema::SchemaValidator;
use crate::spatial::SpatialSummarizer;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use aggregation::{aggregate, verify_unique};
use normalizer::FieldNormalizer;
use report::{CurationReport, Rejection, RejectionKind, ReviewWarning};
use sample_key::{SampleKeyBuilder, clear_fields};
use taxonomy::TaxonParser;

/// Canonical rows and the report of one run
#[derive(Debug, Clone)]
pub struct CurationOutput {
    pub records: Vec<CanonicalRecord>,
    pub report: CurationReport,
}

/// Paths written by [`CurationPipeline::write_outputs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub export: PathBuf,
    pub report: PathBuf,
    pub metadata: Option<PathBuf>,
}

/// Runs every curation stage for one dataset configuration
#[derive(Debug)]
pub struct CurationPipeline {
    config: DatasetConfig,
    spatial: SpatialSummarizer,
}

impl CurationPipeline {
    /// Create a pipeline; the configuration is validated up front
    pub fn new(config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            spatial: SpatialSummarizer::default(),
        })
    }

    pub fn with_spatial_summarizer(mut self, spatial: SpatialSummarizer) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn dataset_name(&self) -> String {
        self.config.dataset_name()
    }

    /// Read the configured input table and curate it
    pub fn run(&self) -> Result<CurationOutput> {
        info!(
            "Curating {} from {}",
            self.dataset_name(),
            self.config.input.path.display()
        );
        let df = read_table(&self.config.input)?;
        self.run_frame(&df)
    }

    /// Read the input table and apply only the schema gate
    pub fn check(&self) -> Result<usize> {
        let df = read_table(&self.config.input)?;
        self.check_schema(&df)?;
        Ok(df.height())
    }

    /// Fail with the full violation list when the table is structurally unsound
    pub fn check_schema(&self, df: &DataFrame) -> Result<()> {
        SchemaValidator::from_config(&self.config).check(df, &self.dataset_name())
    }

    /// Curate an already loaded table
    pub fn run_frame(&self, df: &DataFrame) -> Result<CurationOutput> {
        self.check_schema(df)?;
        let records = records_from_frame(df)?;
        self.run_records(records)
    }

    /// Curate untyped records that already passed the schema gate
    pub fn run_records(&self, records: Vec<RawRecord>) -> Result<CurationOutput> {
        let dataset = self.dataset_name();
        let mut report = CurationReport::new(&dataset);
        report.input_rows = records.len();

        // Field rules and pooling
        let normalized = FieldNormalizer::new(&self.config).normalize(records);
        for rejection in normalized.rejected {
            report.add_rejection(rejection);
        }
        for warning in normalized.warnings {
            report.add_warning(warning);
        }

        // Taxon decomposition
        let parser = TaxonParser::new(
            &self.config.genus_corrections,
            self.config.rules.subgenus_policy,
        );
        let mut parsed = Vec::with_capacity(normalized.accepted.len());
        for record in normalized.accepted {
            match parser.parse(&record.taxon_label, record.family_label.as_deref()) {
                Ok(taxon) => {
                    for (kind, detail) in taxon.warnings {
                        report.add_warning(ReviewWarning::new(record.row, kind, detail));
                    }
                    parsed.push((record, taxon.components));
                }
                Err(e) => {
                    report.add_rejection(Rejection::new(
                        record.row,
                        RejectionKind::UnparsableLabel,
                        e.to_string(),
                    ));
                }
            }
        }

        report.accepted_rows = parsed.iter().map(|(r, _)| r.pooled_rows).sum();
        report.pooled_rows = report.accepted_rows - parsed.len();

        // Sample identity
        let validated: Vec<_> = parsed.iter().map(|(r, _)| r.clone()).collect();
        let keys = SampleKeyBuilder::plan(&self.config, &validated);
        report.sample_key_fields = keys.active_field_names();

        let keyed: Vec<KeyedRecord> = parsed
            .into_iter()
            .map(|(mut record, taxon)| {
                let sample_key = keys.build(&record);
                clear_fields(&mut record, &self.config.rules.clear_after_keying);
                KeyedRecord {
                    record,
                    taxon,
                    sample_key,
                }
            })
            .collect();

        // Event-level aggregation
        let aggregated = aggregate(keyed);
        verify_unique(&aggregated.records, &dataset)?;
        report.aggregated_rows = aggregated.merged;

        // Canonical projection and spatial summary
        let rows = export::to_canonical(&aggregated.records, &self.config);
        report.exported_rows = rows.len();

        match self.spatial.summarize(&export::coordinates(&rows)) {
            Ok(summary) => report.spatial = summary,
            Err(e) => report.geometry_error = Some(e.to_string()),
        }

        if !report.warnings.is_empty() {
            warn!(
                "{}: {} records flagged for review",
                dataset,
                report.warnings.len()
            );
        }
        info!("{}", report.summary());

        Ok(CurationOutput {
            records: rows,
            report,
        })
    }

    /// Write the export, the report, and the spatial metadata into `dir`
    ///
    /// Nothing appears under its final name until every artifact has been
    /// written in full.
    pub fn write_outputs(&self, output: &CurationOutput, dir: &Path) -> Result<WrittenFiles> {
        std::fs::create_dir_all(dir)?;
        let files = self.stage_outputs(output, dir)?.commit()?;

        info!("Wrote {} ({} rows)", files.export.display(), output.records.len());
        Ok(files)
    }

    /// Write every artifact under a temporary name in `dir`
    fn stage_outputs(&self, output: &CurationOutput, dir: &Path) -> Result<StagedOutputs> {
        let name = self.dataset_name();
        let settings = &self.config.output;

        let export = StagedFile::new(
            dir,
            format!("{}.{}", name, settings.format.extension()),
        )?;
        export::write_export(&output.records, export.temp.path(), settings)?;

        let report = StagedFile::new(dir, format!("{}.{}", name, REPORT_SUFFIX))?;
        write_json(report.temp.path(), &output.report)?;

        let metadata = match &output.report.spatial {
            Some(summary) => {
                let staged = StagedFile::new(dir, format!("{}.metadata.json", name))?;
                write_json(staged.temp.path(), summary)?;
                Some(staged)
            }
            None => None,
        };

        Ok(StagedOutputs {
            export,
            report,
            metadata,
        })
    }
}

/// An artifact written under a temporary name, removed on drop unless committed
struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    fn new(dir: &Path, file_name: String) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".partial")
            .tempfile_in(dir)?;
        Ok(Self {
            temp,
            target: dir.join(file_name),
        })
    }

    fn persist(self) -> Result<PathBuf> {
        self.temp
            .persist(&self.target)
            .map_err(|e| CuratorError::Io(e.error))?;
        Ok(self.target)
    }
}

struct StagedOutputs {
    export: StagedFile,
    report: StagedFile,
    metadata: Option<StagedFile>,
}

impl StagedOutputs {
    /// Rename every artifact into place, export last
    fn commit(self) -> Result<WrittenFiles> {
        let metadata = self.metadata.map(StagedFile::persist).transpose()?;
        let report = self.report.persist()?;
        let export = self.export.persist()?;

        Ok(WrittenFiles {
            export,
            report,
            metadata,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CuratorError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, json)?;
    Ok(())
}
