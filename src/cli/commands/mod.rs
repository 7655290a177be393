//! Command implementations for the survey curator CLI
//!
//! Each command lives in its own module; shared helpers (logging, config
//! discovery, run statistics) are in [`shared`].

pub mod process;
pub mod shared;
pub mod validate;

pub use shared::CurationStats;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Dispatch to the selected subcommand
pub async fn run(args: Args) -> Result<CurationStats> {
    match args.command {
        Commands::Process(process_args) => process::run_process(process_args).await,
        Commands::Validate(validate_args) => validate::run_validate(validate_args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curation_stats_re_export() {
        let stats = CurationStats::default();
        assert_eq!(stats.datasets_processed, 0);
        assert_eq!(stats.total_output_size(), 0);
    }
}
