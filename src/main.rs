//! cohortscope: subscription lifetime statistics and cancellation trends
//!
//! Entrypoint that runs the pipeline once: load, clean, report, plot.

use anyhow::Result;
use clap::Parser;
use cohortscope::{compute_summary, load_and_clean_data, stats, viz, Args};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    args.validate()?;
    run_pipeline(&args)
}

/// Logs go to stderr so the report on stdout stays clean
fn init_logging(args: &Args) {
    let filter = if args.verbose || args.quiet {
        tracing_subscriber::EnvFilter::new(args.log_directive())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_directive()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load and clean
    if args.verbose {
        println!("Step 1: Loading and cleaning data");
        println!("  Input file: {}", args.input.display());
    }

    let data_start = Instant::now();
    let data = load_and_clean_data(&args.input)?;
    let data_time = data_start.elapsed();

    if args.verbose {
        println!("  Records: {}", data.len());
        println!("  Duplicate rows removed: {}", data.duplicates_removed);
        println!(
            "  Unparsable canceled_date values: {}",
            data.coerced_cancellations
        );
        println!("  Processing time: {:.2}s\n", data_time.as_secs_f64());
    }

    // Step 2: Statistics
    if args.verbose {
        println!("Step 2: Computing statistics\n");
    }

    let summary = compute_summary(&data);
    stats::print_summary(&summary);

    if summary.durations.negative > 0 {
        tracing::warn!(
            count = summary.durations.negative,
            "Records canceled before they were created"
        );
    }

    // Step 3: Charts
    if args.no_plots {
        debug!("Chart rendering disabled");
    } else {
        if args.verbose {
            println!("Step 3: Rendering charts");
            println!("  Output directory: {}", args.output_dir.display());
        }

        let viz_start = Instant::now();
        let partial = args.partial_month()?;
        let report =
            viz::generate_visualization_report(&data, &args.output_dir, args.bins, &partial)?;

        if let Some(path) = &report.histogram {
            println!("Cancellation histogram saved to: {}", path.display());
        }
        if let Some(path) = &report.heatmap {
            println!("Monthly heatmap saved to: {}", path.display());
        }
        if args.verbose {
            println!("  Rendering time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    if args.verbose {
        println!(
            "\nTotal processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
