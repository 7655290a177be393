//! Validate command implementation
//!
//! Runs the configuration checks and the structural schema gate for each
//! dataset without processing records or writing anything.

use super::shared::{CurationStats, collect_config_paths, load_config, setup_logging};
use crate::cli::args::ValidateArgs;
use crate::error::CuratorError;
use crate::pipeline::CurationPipeline;
use anyhow::{Result, bail};
use colored::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Outcome of checking one dataset
#[derive(Debug)]
pub enum ValidationOutcome {
    Passed { rows: usize },
    Failed { reason: String },
}

/// Validate command runner
pub async fn run_validate(args: ValidateArgs) -> Result<CurationStats> {
    let start_time = Instant::now();
    setup_logging(args.get_log_level(), args.quiet);

    let configs = collect_config_paths(&args.configs, args.glob.as_deref())?;
    info!("Validating {} dataset configurations", configs.len());

    let mut stats = CurationStats::default();
    for config_path in &configs {
        let path = config_path.clone();
        let outcome = tokio::task::spawn_blocking(move || validate_dataset(&path)).await?;

        match &outcome {
            ValidationOutcome::Passed { rows } => {
                stats.datasets_processed += 1;
                stats.input_rows += rows;
                if !args.quiet {
                    println!(
                        "  {} {} ({} rows)",
                        "ok".bright_green().bold(),
                        config_path.display(),
                        rows
                    );
                }
            }
            ValidationOutcome::Failed { reason } => {
                stats.datasets_failed += 1;
                println!(
                    "  {} {}\n      {}",
                    "FAILED".bright_red().bold(),
                    config_path.display(),
                    reason
                );
            }
        }
    }
    stats.processing_time = start_time.elapsed();

    if stats.datasets_failed > 0 {
        bail!(
            "{} of {} datasets failed validation",
            stats.datasets_failed,
            configs.len()
        );
    }

    Ok(stats)
}

/// Check configuration consistency and table structure for one dataset
pub fn validate_dataset(config_path: &Path) -> ValidationOutcome {
    let checked = load_config(config_path).and_then(|config| {
        let pipeline = CurationPipeline::new(config)?;
        Ok(pipeline.check()?)
    });

    match checked {
        Ok(rows) => ValidationOutcome::Passed { rows },
        Err(e) => {
            let reason = match e.downcast_ref::<CuratorError>() {
                Some(CuratorError::Structural { violations, .. }) => violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("\n      "),
                _ => format!("{:#}", e),
            };
            ValidationOutcome::Failed { reason }
        }
    }
}
