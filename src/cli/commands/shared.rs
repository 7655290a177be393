//! Shared components for CLI commands
//!
//! Logging setup, configuration discovery and run statistics used by both
//! the process and validate commands.

use crate::config::DatasetConfig;
use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Run statistics across all datasets of one invocation
#[derive(Debug, Clone, Default)]
pub struct CurationStats {
    pub datasets_processed: usize,
    pub datasets_failed: usize,
    pub input_rows: usize,
    pub exported_rows: usize,
    pub dropped_rows: usize,
    pub warnings: usize,
    pub processing_time: Duration,
    /// Output files with their sizes in bytes
    pub output_sizes: Vec<(String, u64)>,
}

impl CurationStats {
    pub fn total_output_size(&self) -> u64 {
        self.output_sizes.iter().map(|(_, size)| size).sum()
    }

    /// Format a byte count in human-readable form
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

/// Set up structured logging on stderr
///
/// `RUST_LOG` takes precedence over the level derived from the flags.
pub fn setup_logging(log_level: &str, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("survey_curator={}", log_level)));

    // A subscriber may already be installed when commands run inside tests
    let installed = if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}

/// Explicit config paths plus any matched by the glob pattern, sorted and deduplicated
pub fn collect_config_paths(paths: &[PathBuf], pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut configs: Vec<PathBuf> = paths.to_vec();

    if let Some(pattern) = pattern {
        let matches = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern '{}'", pattern))?;
        for entry in matches {
            let path = entry.with_context(|| format!("Failed to read match for '{}'", pattern))?;
            if path.is_file() {
                configs.push(path);
            }
        }
    }

    configs.sort();
    configs.dedup();

    if configs.is_empty() {
        bail!("No dataset configuration files given (pass paths or --glob)");
    }

    debug!("Selected {} configuration files", configs.len());
    Ok(configs)
}

/// Load and validate one dataset configuration
pub fn load_config(path: &Path) -> Result<DatasetConfig> {
    let config = DatasetConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration {}", path.display()))?;
    Ok(config)
}

/// Create a progress bar with the standard styling
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
