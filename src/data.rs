//! Data loading and cleaning of subscription records using Polars

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::CohortError;

/// Column holding the subscription start timestamp
pub const CREATED_DATE: &str = "created_date";
/// Column holding the cancellation timestamp, empty while still subscribed
pub const CANCELED_DATE: &str = "canceled_date";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Timestamp layouts tried in order after RFC 3339
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// One subscriber's lifecycle dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub created_date: NaiveDateTime,
    /// `None` while the subscription is still active
    pub canceled_date: Option<NaiveDateTime>,
}

impl SubscriptionRecord {
    pub fn new(created_date: NaiveDateTime, canceled_date: Option<NaiveDateTime>) -> Self {
        Self {
            created_date,
            canceled_date,
        }
    }

    /// Whole days between creation and cancellation, floored
    pub fn subscription_duration(&self) -> Option<i64> {
        self.canceled_date.map(|canceled| {
            (canceled - self.created_date)
                .num_milliseconds()
                .div_euclid(MILLIS_PER_DAY)
        })
    }

    /// First day of the calendar month the subscription was canceled in
    pub fn canceled_month(&self) -> Option<NaiveDate> {
        self.canceled_date
            .and_then(|canceled| NaiveDate::from_ymd_opt(canceled.year(), canceled.month(), 1))
    }

    pub fn is_active(&self) -> bool {
        self.canceled_date.is_none()
    }
}

/// Cleaned dataset plus bookkeeping from the cleaning pass
#[derive(Debug)]
pub struct SubscriptionData {
    /// Deduplicated table with every source column kept as text
    pub table: DataFrame,
    /// Parsed records, row-aligned with `table`
    pub records: Vec<SubscriptionRecord>,
    /// Rows dropped as exact duplicates
    pub duplicates_removed: usize,
    /// Non-empty `canceled_date` values that failed to parse
    pub coerced_cancellations: usize,
}

impl SubscriptionData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that carry a cancellation date
    pub fn canceled(&self) -> impl Iterator<Item = &SubscriptionRecord> {
        self.records.iter().filter(|record| !record.is_active())
    }

    /// Present cancellation timestamps in row order
    pub fn cancellation_dates(&self) -> Vec<NaiveDateTime> {
        self.records
            .iter()
            .filter_map(|record| record.canceled_date)
            .collect()
    }
}

/// Read the CSV at `file_path` with every column kept as text
pub fn load_data(file_path: &Path) -> crate::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))
        .with_context(|| format!("Failed to open input CSV: {}", file_path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse input CSV: {}", file_path.display()))?;

    debug!(
        rows = df.height(),
        columns = df.width(),
        "Loaded {}",
        file_path.display()
    );
    Ok(df)
}

/// Drop rows that are identical across all columns, keeping the first
pub fn drop_duplicates(df: &DataFrame) -> crate::Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Deduplicate and parse the date columns into records
pub fn clean_data(df: &DataFrame) -> crate::Result<SubscriptionData> {
    let deduped = drop_duplicates(df)?;
    let duplicates_removed = df.height() - deduped.height();

    let created = required_column(&deduped, CREATED_DATE)?;
    let canceled = required_column(&deduped, CANCELED_DATE)?;

    let mut records = Vec::with_capacity(deduped.height());
    let mut coerced_cancellations = 0;

    for (row, (created_raw, canceled_raw)) in created.into_iter().zip(canceled).enumerate() {
        let created_date = created_raw.and_then(parse_timestamp).ok_or_else(|| {
            CohortError::UnparsableCreatedDate {
                row,
                value: created_raw.unwrap_or_default().to_string(),
            }
        })?;

        let canceled_date = match canceled_raw.map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    debug!(row, value = raw, "Coercing unparsable canceled_date to missing");
                    coerced_cancellations += 1;
                }
                parsed
            }
        };

        records.push(SubscriptionRecord::new(created_date, canceled_date));
    }

    if duplicates_removed > 0 {
        debug!(duplicates_removed, "Removed duplicate rows");
    }
    if coerced_cancellations > 0 {
        warn!(
            coerced_cancellations,
            "Unparsable canceled_date values treated as missing"
        );
    }

    Ok(SubscriptionData {
        table: deduped,
        records,
        duplicates_removed,
        coerced_cancellations,
    })
}

/// Load and clean in one step
pub fn load_and_clean_data(file_path: &Path) -> crate::Result<SubscriptionData> {
    let df = load_data(file_path)?;
    clean_data(&df).with_context(|| format!("Failed to clean {}", file_path.display()))
}

/// Parse a timestamp in any of the accepted layouts
///
/// Offsets are normalized to UTC. Date-only values land on midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> crate::Result<&'a StringChunked> {
    let column = df
        .column(name)
        .map_err(|_| CohortError::MissingColumn(name.to_string()))?;
    Ok(column.str()?)
}
