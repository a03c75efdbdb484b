//! Summary statistics over cleaned subscription records

use chrono::NaiveDateTime;

use crate::data::SubscriptionData;

/// Descriptive statistics for subscription durations in days
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    /// Number of records with a defined duration
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample variance (n - 1 denominator)
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    /// Durations below zero, i.e. cancellation before creation
    pub negative: usize,
}

impl DurationStats {
    /// Describe a set of durations; undefined moments stay `None`
    pub fn from_durations(durations: &[i64]) -> Self {
        let count = durations.len();
        let negative = durations.iter().filter(|&&days| days < 0).count();

        let mean = (count > 0).then(|| durations.iter().sum::<i64>() as f64 / count as f64);

        let variance = mean.filter(|_| count > 1).map(|mean| {
            durations
                .iter()
                .map(|&days| (days as f64 - mean).powi(2))
                .sum::<f64>()
                / (count - 1) as f64
        });

        Self {
            count,
            mean,
            variance,
            std_dev: variance.map(f64::sqrt),
            negative,
        }
    }
}

/// Console summary of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    /// Earliest `created_date`
    pub timeframe_start: Option<NaiveDateTime>,
    /// Latest `created_date`
    pub timeframe_end: Option<NaiveDateTime>,
    pub total_subscribers: usize,
    /// Reported under the "Current subscribers" heading, but counts rows
    /// that *have* a cancellation date
    pub current_subscribers: usize,
    /// Rows without a cancellation date
    pub active_subscribers: usize,
    pub durations: DurationStats,
}

impl SummaryStats {
    /// Same number as `current_subscribers`, under its accurate name
    pub fn canceled_subscribers(&self) -> usize {
        self.current_subscribers
    }
}

/// Compute time span, subscriber counts and duration statistics
pub fn compute_summary(data: &SubscriptionData) -> SummaryStats {
    let records = &data.records;

    let durations: Vec<i64> = records
        .iter()
        .filter_map(|record| record.subscription_duration())
        .collect();
    let current_subscribers = durations.len();

    SummaryStats {
        timeframe_start: records.iter().map(|record| record.created_date).min(),
        timeframe_end: records.iter().map(|record| record.created_date).max(),
        total_subscribers: records.len(),
        current_subscribers,
        active_subscribers: records.len() - current_subscribers,
        durations: DurationStats::from_durations(&durations),
    }
}

/// Render the summary as the lines printed to the console
pub fn format_summary(stats: &SummaryStats) -> Vec<String> {
    let separator = "\n------------------------\n".to_string();
    let durations = &stats.durations;

    vec![
        format!("Dataset timeframe start: {}", format_timestamp(stats.timeframe_start)),
        format!("Dataset timeframe end: {}", format_timestamp(stats.timeframe_end)),
        separator.clone(),
        format!("Total subscribers: {}", stats.total_subscribers),
        format!("Current subscribers: {}", stats.current_subscribers),
        format!("  Canceled subscribers (with canceled_date): {}", stats.canceled_subscribers()),
        format!("  Active subscribers (no canceled_date): {}", stats.active_subscribers),
        separator.clone(),
        format!(
            "Average subscription duration: {} days",
            format_stat(durations.mean, 1)
        ),
        format!(
            "Variance of subscription duration: {}",
            format_stat(durations.variance, 2)
        ),
        format!(
            "Standard deviation of subscription duration: {}",
            format_stat(durations.std_dev, 2)
        ),
        separator,
    ]
}

/// Print the summary to stdout
pub fn print_summary(stats: &SummaryStats) {
    for line in format_summary(stats) {
        println!("{}", line);
    }
}

fn format_stat(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{:.*}", precision, value),
        None => "nan".to_string(),
    }
}

fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(|| "NaT".to_string(), |ts| ts.to_string())
}

/// One histogram bin over epoch seconds; `end` is exclusive except for the last bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Bin timestamps into `bins` equal-width bins spanning the observed range
///
/// A degenerate range (all values equal) is widened by half a day on each side.
pub fn histogram_bins(values: &[NaiveDateTime], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let seconds: Vec<f64> = values
        .iter()
        .map(|value| value.and_utc().timestamp() as f64)
        .collect();

    let mut lower = seconds.iter().copied().fold(f64::INFINITY, f64::min);
    let mut upper = seconds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lower == upper {
        lower -= 43_200.0;
        upper += 43_200.0;
    }

    let width = (upper - lower) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &second in &seconds {
        let index = (((second - lower) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lower + width * i as f64,
            end: if i + 1 == bins {
                upper
            } else {
                lower + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}
