//! Integration tests for cohortscope

use cohortscope::{
    compute_summary, generate_visualization_report, load_and_clean_data, stats::format_summary,
    viz, CohortError, MonthlyCancellations, PartialMonth,
};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

/// Five rows, two of them exact duplicates
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "customer_id,created_date,canceled_date,subscription_cost,\
         subscription_interval,was_subscription_paid"
    )
    .unwrap();

    // Customer 1 - canceled after 10 days, exported twice
    writeln!(file, "1,2023-01-01,2023-01-11,39,month,Yes").unwrap();
    writeln!(file, "1,2023-01-01,2023-01-11,39,month,Yes").unwrap();

    // Customer 2 - canceled after 30 days, exported twice
    writeln!(file, "2,2023-01-05,2023-02-04,39,month,Yes").unwrap();
    writeln!(file, "2,2023-01-05,2023-02-04,39,month,Yes").unwrap();

    // Customer 3 - still subscribed
    writeln!(file, "3,2023-01-20,,39,month,Yes").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let data = load_and_clean_data(test_file.path()).unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data.duplicates_removed, 2);
    assert_eq!(data.table.height(), 3);

    let summary = compute_summary(&data);
    assert_eq!(summary.total_subscribers, 3);
    assert_eq!(summary.active_subscribers, 1);
    assert_eq!(summary.canceled_subscribers(), 2);
    // The "current subscribers" line reports the canceled count
    assert_eq!(summary.current_subscribers, 2);

    assert_eq!(summary.durations.count, 2);
    assert_eq!(summary.durations.mean, Some(20.0));
    assert_eq!(summary.durations.variance, Some(200.0));

    let lines = format_summary(&summary);
    assert!(lines.contains(&"Total subscribers: 3".to_string()));
    assert!(lines.contains(&"Current subscribers: 2".to_string()));

    let temp_dir = tempdir().unwrap();
    let report =
        generate_visualization_report(&data, temp_dir.path(), 30, &PartialMonth::default())
            .unwrap();
    assert!(report.histogram.unwrap().exists());
    assert!(report.heatmap.unwrap().exists());
}

#[test]
fn test_cleaning_is_idempotent() {
    let test_file = create_test_csv();
    let data = load_and_clean_data(test_file.path()).unwrap();

    let again = cohortscope::data::clean_data(&data.table).unwrap();
    assert_eq!(again.duplicates_removed, 0);
    assert_eq!(again.records, data.records);
}

#[test]
fn test_monthly_aggregation() {
    let test_file = create_test_csv();
    let data = load_and_clean_data(test_file.path()).unwrap();

    let monthly =
        MonthlyCancellations::from_records(&data.records, &PartialMonth::default()).unwrap();
    assert_eq!(monthly.labels(), vec!["Jan 2023", "Feb 2023"]);
    assert_eq!(
        monthly.buckets.iter().map(|b| b.count).collect::<Vec<_>>(),
        vec![1, 1]
    );
    assert_eq!(monthly.unadjusted_last, None);
}

#[test]
fn test_september_tail_is_scaled() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "created_date,canceled_date").unwrap();
    for day in 1..=8 {
        writeln!(file, "2023-01-01,2023-09-0{}", day).unwrap();
    }
    writeln!(file, "2023-01-01,2023-08-15").unwrap();

    let data = load_and_clean_data(file.path()).unwrap();
    let monthly =
        MonthlyCancellations::from_records(&data.records, &PartialMonth::default()).unwrap();

    assert_eq!(monthly.unadjusted_last, Some(8));
    assert_eq!(monthly.heatmap_matrix().row(0).to_vec(), vec![1, 30]);
}

#[test]
fn test_error_handling_missing_file() {
    let dir = tempdir().unwrap();
    let result = load_and_clean_data(&dir.path().join("missing.csv"));
    assert!(result.is_err());
}

#[test]
fn test_error_handling_bad_created_date() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "created_date,canceled_date").unwrap();
    writeln!(file, "2023-01-01,2023-02-01").unwrap();
    writeln!(file, "someday,2023-02-01").unwrap();

    let err = load_and_clean_data(file.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CohortError>(),
        Some(CohortError::UnparsableCreatedDate { row: 1, .. })
    ));
}

#[test]
fn test_unparsable_cancellations_are_missing() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "created_date,canceled_date").unwrap();
    writeln!(file, "2023-01-01,never").unwrap();
    writeln!(file, "2023-01-02,").unwrap();

    let data = load_and_clean_data(file.path()).unwrap();
    let summary = compute_summary(&data);

    assert_eq!(data.coerced_cancellations, 1);
    assert_eq!(summary.active_subscribers, 2);
    assert_eq!(summary.durations.mean, None);

    let temp_dir = tempdir().unwrap();
    let report = generate_visualization_report(&data, temp_dir.path(), 30, &PartialMonth::default())
        .unwrap();
    assert_eq!(report, viz::VisualizationReport::default());
}

#[test]
fn test_header_only_file_reports_empty_statistics() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "created_date,canceled_date").unwrap();

    let data = load_and_clean_data(file.path()).unwrap();
    assert!(data.is_empty());

    let lines = format_summary(&compute_summary(&data));
    assert!(lines.contains(&"Dataset timeframe start: NaT".to_string()));
    assert!(lines.contains(&"Dataset timeframe end: NaT".to_string()));
    assert!(lines.contains(&"Total subscribers: 0".to_string()));
    assert!(lines.contains(&"Current subscribers: 0".to_string()));
    assert!(lines.contains(&"Average subscription duration: nan days".to_string()));

    let temp_dir = tempdir().unwrap();
    let report =
        generate_visualization_report(&data, temp_dir.path(), 30, &PartialMonth::default())
            .unwrap();
    assert_eq!(report, viz::VisualizationReport::default());
}
