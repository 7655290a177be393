//! Process command implementation
//!
//! Loads every selected dataset configuration, curates the datasets
//! concurrently on blocking worker threads and prints a run summary.

use super::shared::{
    CurationStats, collect_config_paths, create_progress_bar, load_config, setup_logging,
};
use crate::cli::args::ProcessArgs;
use crate::config::ExportFormat;
use crate::pipeline::report::CurationReport;
use crate::pipeline::{CurationPipeline, WrittenFiles};
use anyhow::{Context, Result, bail};
use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::HumanDuration;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info};

/// Result of curating one dataset
#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub config_path: PathBuf,
    pub report: CurationReport,
    pub files: WrittenFiles,
}

/// Process command runner
///
/// 1. Set up logging and collect configuration files
/// 2. Curate each dataset on a blocking worker, bounded by `--workers`
/// 3. Print the run summary
pub async fn run_process(args: ProcessArgs) -> Result<CurationStats> {
    let start_time = Instant::now();
    setup_logging(args.get_log_level(), args.quiet);

    info!("Starting survey curation");
    debug!("Command line arguments: {:?}", args);

    let configs = collect_config_paths(&args.configs, args.glob.as_deref())?;
    let format: Option<ExportFormat> = args.format.map(Into::into);
    let workers = args.worker_count();

    info!(
        "Curating {} datasets with {} workers into {}",
        configs.len(),
        workers,
        args.output_dir.display()
    );

    let progress_bar = args
        .show_progress()
        .then(|| create_progress_bar(configs.len() as u64, "Curating datasets"));

    let results: Vec<(PathBuf, Result<DatasetOutcome>)> = stream::iter(configs)
        .map(|config_path| {
            let output_dir = args.output_dir.clone();
            let progress_bar = progress_bar.clone();
            async move {
                let path = config_path.clone();
                let outcome = task::spawn_blocking(move || {
                    curate_dataset(&path, &output_dir, format)
                })
                .await
                .context("Dataset worker panicked")
                .and_then(|result| result);

                if let Some(pb) = &progress_bar {
                    pb.inc(1);
                }
                (config_path, outcome)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    if let Some(pb) = &progress_bar {
        pb.finish_and_clear();
    }

    let mut stats = CurationStats::default();
    let mut failures = Vec::new();
    for (config_path, result) in results {
        match result {
            Ok(outcome) => {
                stats.datasets_processed += 1;
                stats.input_rows += outcome.report.input_rows;
                stats.exported_rows += outcome.report.exported_rows;
                stats.dropped_rows += outcome.report.dropped_rows();
                stats.warnings += outcome.report.warnings.len();
                stats.output_sizes.extend(output_sizes(&outcome.files));
            }
            Err(e) => {
                error!("Failed to curate {}: {:#}", config_path.display(), e);
                stats.datasets_failed += 1;
                failures.push((config_path, e));
            }
        }
    }
    stats.output_sizes.sort();
    stats.processing_time = start_time.elapsed();

    if !args.quiet {
        print_summary(&stats, &failures);
    }

    if !failures.is_empty() {
        bail!(
            "{} of {} datasets failed",
            failures.len(),
            stats.datasets_processed + failures.len()
        );
    }

    Ok(stats)
}

/// Curate one dataset end to end and write its outputs
pub fn curate_dataset(
    config_path: &Path,
    output_dir: &Path,
    format: Option<ExportFormat>,
) -> Result<DatasetOutcome> {
    let mut config = load_config(config_path)?;
    if let Some(format) = format {
        config = config.with_export_format(format);
    }

    let pipeline = CurationPipeline::new(config)?;
    let name = pipeline.dataset_name();

    let output = pipeline
        .run()
        .with_context(|| format!("Curation of '{}' failed", name))?;
    let files = pipeline
        .write_outputs(&output, output_dir)
        .with_context(|| format!("Writing outputs for '{}' failed", name))?;

    Ok(DatasetOutcome {
        config_path: config_path.to_path_buf(),
        report: output.report,
        files,
    })
}

fn output_sizes(files: &WrittenFiles) -> Vec<(String, u64)> {
    std::iter::once(&files.export)
        .chain(std::iter::once(&files.report))
        .chain(files.metadata.iter())
        .filter_map(|path| {
            let size = std::fs::metadata(path).ok()?.len();
            let name = path.file_name()?.to_string_lossy().to_string();
            Some((name, size))
        })
        .collect()
}

fn print_summary(stats: &CurationStats, failures: &[(PathBuf, anyhow::Error)]) {
    println!("\n{}", "Curation Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(stats.processing_time).to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Datasets curated:".bright_cyan(),
        stats.datasets_processed.to_string().bright_white()
    );
    println!(
        "  {} {} in, {} out, {} dropped",
        "Rows:".bright_cyan(),
        stats.input_rows.to_string().bright_white(),
        stats.exported_rows.to_string().bright_white().bold(),
        stats.dropped_rows.to_string().bright_yellow()
    );
    if stats.warnings > 0 {
        println!(
            "  {} {}",
            "Flagged for review:".bright_yellow(),
            stats.warnings.to_string().bright_yellow().bold()
        );
    }
    for (name, size) in &stats.output_sizes {
        println!("    {} ({})", name, CurationStats::format_size(*size));
    }
    if !failures.is_empty() {
        println!(
            "  {} {}",
            "Datasets failed:".bright_red(),
            failures.len().to_string().bright_red().bold()
        );
        for (path, error) in failures {
            println!("    {}: {:#}", path.display(), error);
        }
    }
}
