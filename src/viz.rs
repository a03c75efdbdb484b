//! Visualization of cancellation trends using Plotters

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::DateTime;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, warn};

use crate::cohort::{MonthlyCancellations, PartialMonth};
use crate::data::SubscriptionData;
use crate::stats::histogram_bins;

pub const HISTOGRAM_FILE: &str = "cancellation_histogram.png";
pub const HEATMAP_FILE: &str = "cancellations_by_month.png";

const BAR_COLOR: RGBColor = RGBColor(76, 114, 176);

/// Yellow-green-blue ramp, light to dark
const YL_GN_BU: [RGBColor; 9] = [
    RGBColor(255, 255, 217),
    RGBColor(237, 248, 177),
    RGBColor(199, 233, 180),
    RGBColor(127, 205, 187),
    RGBColor(65, 182, 196),
    RGBColor(29, 145, 192),
    RGBColor(34, 94, 168),
    RGBColor(37, 52, 148),
    RGBColor(8, 29, 88),
];

/// Paths of the charts written by [`generate_visualization_report`]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VisualizationReport {
    pub histogram: Option<PathBuf>,
    pub heatmap: Option<PathBuf>,
}

/// Interpolate the yellow-green-blue ramp at `t` in [0, 1]
pub fn ylgnbu(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (YL_GN_BU.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(YL_GN_BU.len() - 1);
    let frac = scaled - lower as f64;

    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (YL_GN_BU[lower], YL_GN_BU[upper]);
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn date_label(epoch_seconds: f64) -> String {
    DateTime::from_timestamp(epoch_seconds as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Histogram of cancellation dates
///
/// Returns `false` without touching `output_path` when there is nothing to plot.
pub fn create_cancellation_histogram(
    data: &SubscriptionData,
    bins: usize,
    output_path: &Path,
) -> crate::Result<bool> {
    let histogram = histogram_bins(&data.cancellation_dates(), bins);
    let (Some(first), Some(last)) = (histogram.first(), histogram.last()) else {
        warn!("No cancellation dates present, skipping histogram");
        return Ok(false);
    };

    let max_count = histogram.iter().map(|bin| bin.count).max().unwrap_or(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Distribution of Subscription Cancellation Dates", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(first.start..last.end, 0f64..(max_count * 1.05))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Canceled Date")
        .y_desc("Number of Cancellations")
        .x_labels(10)
        .x_label_formatter(&|x| date_label(*x))
        .y_label_formatter(&|y| format!("{:.0}", y))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(histogram.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], BAR_COLOR.filled())
    }))?;
    chart.draw_series(histogram.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], WHITE.stroke_width(1))
    }))?;

    root.present()
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    debug!("Cancellation histogram saved to: {}", output_path.display());

    Ok(true)
}

/// Single-row heatmap of cancellations per month, annotated with counts
pub fn create_monthly_heatmap(
    monthly: &MonthlyCancellations,
    output_path: &Path,
) -> crate::Result<bool> {
    if monthly.is_empty() {
        warn!("No cancellation months present, skipping heatmap");
        return Ok(false);
    }

    let matrix = monthly.heatmap_matrix();
    let labels = monthly.labels();
    let n_months = matrix.ncols() as i32;
    let min_count = matrix.iter().copied().min().unwrap_or(0) as f64;
    let max_count = matrix.iter().copied().max().unwrap_or(0) as f64;
    let span = (max_count - min_count).max(1.0);
    let shade = |count: u64| (count as f64 - min_count) / span;

    let root = BitMapBackend::new(output_path, (1200, 260)).into_drawing_area();
    root.fill(&WHITE)?;
    let (heat_area, bar_area) = root.split_horizontally(1080);

    let mut chart = ChartBuilder::on(&heat_area)
        .caption("Cancellations by Month", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(10)
        .build_cartesian_2d((0..n_months).into_segmented(), 0f64..1f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_labels(labels.len())
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(matrix.row(0).iter().enumerate().map(|(i, &count)| {
        let i = i as i32;
        Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), 1.0)],
            ylgnbu(shade(count)).filled(),
        )
    }))?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    chart.draw_series(matrix.row(0).iter().enumerate().map(|(i, &count)| {
        let text_color = if shade(count) > 0.5 { WHITE } else { BLACK };
        Text::new(
            count.to_string(),
            (SegmentValue::CenterOf(i as i32), 0.5),
            ("sans-serif", 16).into_font().color(&text_color).pos(centered),
        )
    }))?;

    draw_color_bar(&bar_area, min_count, max_count)?;

    root.present()
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    debug!("Monthly heatmap saved to: {}", output_path.display());

    Ok(true)
}

fn draw_color_bar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    min_count: f64,
    max_count: f64,
) -> crate::Result<()> {
    let upper = if max_count > min_count { max_count } else { min_count + 1.0 };
    let steps = 50;
    let step = (upper - min_count) / steps as f64;

    let mut chart = ChartBuilder::on(area)
        .margin_top(45)
        .margin_bottom(50)
        .margin_right(50)
        .right_y_label_area_size(40)
        .build_cartesian_2d(0f64..1f64, min_count..upper)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(5)
        .y_desc("Cancellations")
        .y_label_formatter(&|y| format!("{:.0}", y))
        .draw()?;

    chart.draw_series((0..steps).map(|i| {
        let low = min_count + step * i as f64;
        let t = (i as f64 + 0.5) / steps as f64;
        Rectangle::new([(0.0, low), (1.0, low + step)], ylgnbu(t).filled())
    }))?;

    Ok(())
}

/// Render both charts into `output_dir`, creating it if needed
pub fn generate_visualization_report(
    data: &SubscriptionData,
    output_dir: &Path,
    bins: usize,
    partial: &PartialMonth,
) -> crate::Result<VisualizationReport> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    // Charts only look at subscribers who actually canceled
    let canceled: Vec<_> = data.canceled().copied().collect();

    let histogram_path = output_dir.join(HISTOGRAM_FILE);
    let histogram = create_cancellation_histogram(data, bins, &histogram_path)?
        .then_some(histogram_path);

    let monthly = MonthlyCancellations::from_records(&canceled, partial)?;
    let heatmap_path = output_dir.join(HEATMAP_FILE);
    let heatmap = create_monthly_heatmap(&monthly, &heatmap_path)?.then_some(heatmap_path);

    Ok(VisualizationReport { histogram, heatmap })
}
