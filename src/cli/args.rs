//! Command-line argument definitions for the survey curator
//!
//! Defines the CLI interface using the clap derive API. Each dataset is
//! described by its own TOML configuration file; the CLI only selects
//! which configurations to run and where outputs go.

use crate::config::ExportFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the survey curator
///
/// Curates contributed ecological survey datasets into the canonical
/// long-term record schema.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "survey-curator",
    version,
    about = "Validate, normalize and aggregate contributed ecological survey datasets",
    long_about = "Checks contributed survey tables against their dataset configuration, \
                  drops records that fail primary-field rules, decomposes taxon labels, \
                  aggregates observations per sampling event and exports the canonical \
                  record schema together with a curation report and spatial metadata."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Curate datasets and write canonical exports
    Process(ProcessArgs),
    /// Run only the structural schema gate, writing nothing
    Validate(ValidateArgs),
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Dataset configuration files (TOML)
    #[arg(value_name = "CONFIGS")]
    pub configs: Vec<PathBuf>,

    /// Glob pattern selecting additional configuration files
    #[arg(long = "glob", value_name = "PATTERN")]
    pub glob: Option<String>,

    /// Output directory for exports and reports
    ///
    /// Will be created if it doesn't exist. Each dataset writes
    /// `<name>.<csv|parquet>`, `<name>.report.json` and, when locations are
    /// available, `<name>.metadata.json`.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = "curated",
        help = "Output directory for exports and reports"
    )]
    pub output_dir: PathBuf,

    /// Override the export format of every dataset
    #[arg(long = "format", value_enum)]
    pub format: Option<FormatArg>,

    /// Number of datasets curated concurrently
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        default_value_t = num_cpus::get(),
        help = "Number of datasets processed concurrently"
    )]
    pub workers: usize,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Arguments for the validate command
#[derive(Debug, Clone, Parser)]
pub struct ValidateArgs {
    /// Dataset configuration files (TOML)
    #[arg(value_name = "CONFIGS")]
    pub configs: Vec<PathBuf>,

    /// Glob pattern selecting additional configuration files
    #[arg(long = "glob", value_name = "PATTERN")]
    pub glob: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Export format selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Parquet => ExportFormat::Parquet,
        }
    }
}

/// Map verbosity flags to a tracing level name
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

impl ProcessArgs {
    pub fn get_log_level(&self) -> &'static str {
        log_level(self.verbose, self.quiet)
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet && self.verbose == 0
    }

    /// Worker count, never below one
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl ValidateArgs {
    pub fn get_log_level(&self) -> &'static str {
        log_level(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_args_parse() {
        let args = Args::try_parse_from([
            "survey-curator",
            "process",
            "a.toml",
            "b.toml",
            "-o",
            "out",
            "--format",
            "parquet",
            "-j",
            "3",
            "-vv",
        ])
        .unwrap();

        match args.command {
            Commands::Process(process) => {
                assert_eq!(process.configs.len(), 2);
                assert_eq!(process.output_dir, PathBuf::from("out"));
                assert_eq!(process.format, Some(FormatArg::Parquet));
                assert_eq!(process.worker_count(), 3);
                assert_eq!(process.get_log_level(), "debug");
                assert!(!process.show_progress());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result =
            Args::try_parse_from(["survey-curator", "validate", "a.toml", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0, false), "warn");
        assert_eq!(log_level(1, false), "info");
        assert_eq!(log_level(5, false), "trace");
        assert_eq!(log_level(3, true), "error");
    }

    #[test]
    fn test_zero_workers_clamped() {
        let args =
            Args::try_parse_from(["survey-curator", "process", "a.toml", "-j", "0"]).unwrap();
        let Commands::Process(process) = args.command else {
            panic!("expected process");
        };
        assert_eq!(process.worker_count(), 1);
    }
}
