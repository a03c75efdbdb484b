//! cohortscope: exploratory analysis of a subscription cohort export
//!
//! Loads subscription records from CSV, removes duplicates, parses the
//! lifecycle dates, reports lifetime statistics and renders cancellation
//! trend charts.

pub mod cli;
pub mod cohort;
pub mod data;
pub mod error;
pub mod stats;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use cohort::{MonthlyBucket, MonthlyCancellations, PartialMonth};
pub use data::{load_and_clean_data, SubscriptionData, SubscriptionRecord};
pub use error::CohortError;
pub use stats::{compute_summary, DurationStats, SummaryStats};
pub use viz::generate_visualization_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
