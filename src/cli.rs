//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::cohort::PartialMonth;
use crate::error::CohortError;

/// Subscription cohort analysis: lifetime statistics and cancellation trends
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the subscription CSV export
    #[arg(short, long, default_value = "data/Subscription Cohort Analysis Data.csv")]
    pub input: PathBuf,

    /// Directory the charts are written to
    #[arg(short, long, default_value = "plots")]
    pub output_dir: PathBuf,

    /// Number of bins in the cancellation date histogram
    #[arg(long, default_value = "30")]
    pub bins: usize,

    /// Calendar month (1-12) that gets the partial-month correction when it is the last month
    #[arg(long, default_value = "9")]
    pub partial_month: u32,

    /// Days of the final month covered by the dataset
    #[arg(long, default_value = "8")]
    pub partial_days: u32,

    /// Days the partial month is scaled up to
    #[arg(long, default_value = "30")]
    pub month_length: u32,

    /// Print statistics only, skip chart rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Partial-month correction described by the flags
    pub fn partial_month(&self) -> crate::Result<PartialMonth> {
        Ok(PartialMonth::new(
            self.partial_month,
            self.partial_days,
            self.month_length,
        )?)
    }

    /// Check flag values that clap cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if self.bins == 0 {
            return Err(CohortError::InvalidParameter {
                name: "bins",
                reason: "histogram needs at least one bin".to_string(),
            }
            .into());
        }
        self.partial_month()?;
        Ok(())
    }

    /// Log filter directive implied by --verbose / --quiet
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "cohortscope=debug"
        } else {
            "cohortscope=info"
        }
    }
}
