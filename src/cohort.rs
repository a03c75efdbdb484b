//! Monthly cancellation cohorts and partial-month normalization

use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use polars::prelude::*;
use tracing::info;

use crate::data::SubscriptionRecord;
use crate::error::CohortError;

const MONTH_KEY_FORMAT: &str = "%Y-%m";

/// Scale-up applied to a final month that was only partly observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialMonth {
    /// Calendar month (1-12) the correction applies to
    pub month: u32,
    /// Days of that month present in the dataset
    pub days_observed: u32,
    /// Days the month is treated as having
    pub month_length: u32,
}

impl Default for PartialMonth {
    /// The export ends on 8 September
    fn default() -> Self {
        Self {
            month: 9,
            days_observed: 8,
            month_length: 30,
        }
    }
}

impl PartialMonth {
    pub fn new(month: u32, days_observed: u32, month_length: u32) -> Result<Self, CohortError> {
        if !(1..=12).contains(&month) {
            return Err(CohortError::InvalidParameter {
                name: "partial-month",
                reason: format!("month must be between 1 and 12, got {}", month),
            });
        }
        if days_observed == 0 {
            return Err(CohortError::InvalidParameter {
                name: "partial-days",
                reason: "at least one day must be observed".to_string(),
            });
        }
        if month_length == 0 {
            return Err(CohortError::InvalidParameter {
                name: "month-length",
                reason: "month length must be positive".to_string(),
            });
        }

        Ok(Self {
            month,
            days_observed,
            month_length,
        })
    }

    pub fn factor(&self) -> f64 {
        self.month_length as f64 / self.days_observed as f64
    }

    pub fn applies_to(&self, month: NaiveDate) -> bool {
        month.month() == self.month
    }

    /// Scaled count, truncated toward zero
    pub fn scale(&self, count: u64) -> u64 {
        (count as f64 * self.factor()) as u64
    }
}

/// Cancellation count for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyBucket {
    /// First day of the month
    pub month: NaiveDate,
    pub count: u64,
}

impl MonthlyBucket {
    /// Abbreviated month and year, e.g. "Sep 2023"
    pub fn label(&self) -> String {
        self.month.format("%b %Y").to_string()
    }
}

/// Monthly buckets ready for the heatmap
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyCancellations {
    /// Ascending by month
    pub buckets: Vec<MonthlyBucket>,
    /// Count of the last bucket before scaling, when the correction was applied
    pub unadjusted_last: Option<u64>,
}

impl MonthlyCancellations {
    /// Group records by cancellation month and apply the partial-month correction
    pub fn from_records(
        records: &[SubscriptionRecord],
        partial: &PartialMonth,
    ) -> crate::Result<Self> {
        let mut buckets = cancellations_by_month(records)?;
        let unadjusted_last = normalize_partial_month(&mut buckets, partial);

        if let (Some(raw), Some(last)) = (unadjusted_last, buckets.last()) {
            info!(
                month = %last.label(),
                raw,
                scaled = last.count,
                "Scaled partial final month by {:.3}",
                partial.factor()
            );
        }

        Ok(Self {
            buckets,
            unadjusted_last,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(MonthlyBucket::label).collect()
    }

    /// Counts as a single-row matrix, one column per month
    pub fn heatmap_matrix(&self) -> Array2<u64> {
        let counts: Vec<u64> = self.buckets.iter().map(|bucket| bucket.count).collect();
        Array2::from_shape_vec((1, counts.len()), counts)
            .unwrap_or_else(|_| Array2::zeros((1, 0)))
    }
}

/// Count canceled records per calendar month, ascending; active records are skipped
pub fn cancellations_by_month(
    records: &[SubscriptionRecord],
) -> crate::Result<Vec<MonthlyBucket>> {
    let months: Vec<String> = records
        .iter()
        .filter_map(SubscriptionRecord::canceled_month)
        .map(|month| month.format(MONTH_KEY_FORMAT).to_string())
        .collect();

    let df = df!("canceled_month" => &months)?
        .lazy()
        .group_by([col("canceled_month")])
        .agg([len().alias("count")])
        .sort(["canceled_month"], SortMultipleOptions::default())
        .collect()?;

    let keys = df.column("canceled_month")?.str()?;
    let counts = df.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    keys.into_no_null_iter()
        .zip(counts.into_no_null_iter())
        .map(|(key, count)| -> crate::Result<MonthlyBucket> {
            let month = NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")?;
            Ok(MonthlyBucket { month, count })
        })
        .collect()
}

/// Scale the last bucket when it falls in the partial month
///
/// Returns the original count when a correction was applied.
pub fn normalize_partial_month(
    buckets: &mut [MonthlyBucket],
    partial: &PartialMonth,
) -> Option<u64> {
    let last = buckets.last_mut()?;
    if !partial.applies_to(last.month) {
        return None;
    }

    let raw = last.count;
    last.count = partial.scale(raw);
    Some(raw)
}
