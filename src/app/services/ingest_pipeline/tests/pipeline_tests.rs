//! Tests for line-level and field-level policy handling in the pipeline

use super::*;
use crate::Error;
use crate::app::services::index_writer::MemorySink;
use crate::app::services::ingest_pipeline::FieldErrorPolicy;
use tokio_util::sync::CancellationToken;

fn policy(on_field_error: FieldErrorPolicy) -> IngestPolicy {
    IngestPolicy {
        strict_format: false,
        on_field_error,
    }
}

#[tokio::test]
async fn test_clean_source_is_written() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,\"12,5\"\nD-1,2,3\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_read, 2);
    assert_eq!(report.records_written, 2);
    assert!(report.is_clean());
    assert!(sink.is_closed());
    assert_eq!(sink.get("D-1_1").unwrap()["quantity"], 12.5);
}

#[tokio::test]
async fn test_malformed_line_is_skipped_and_run_continues() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,1.5\nD-1,2\nD-1,3,2.5\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_read, 3);
    assert_eq!(report.format_errors, 1);
    assert_eq!(report.records_written, 2);
    assert!(sink.get("D-1_2").is_none());
    assert!(sink.get("D-1_3").is_some());
    assert!(report.issues[0].contains("line 2"));
}

#[tokio::test]
async fn test_strict_format_aborts_on_malformed_line() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,1.5\nD-1,2\n";
    let strict = IngestPolicy {
        strict_format: true,
        ..IngestPolicy::default()
    };

    let error = small_pipeline(strict)
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        Error::Format {
            line: 2,
            expected: 3,
            found: 2
        }
    ));
}

#[tokio::test]
async fn test_repeated_identity_overwrites() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,1.0\nD-1,1,9.0\n";

    let report = small_pipeline(IngestPolicy::default())
        .with_duplicate_tracking(true)
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.duplicate_ids, 1);
    assert_eq!(report.records_written, 2);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.get("D-1_1").unwrap()["quantity"], 9.0);
}

#[tokio::test]
async fn test_repeated_identity_uncounted_without_tracking() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,1.0\nD-1,1,9.0\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.duplicate_ids, 0);
    assert_eq!(report.records_written, 2);
    assert_eq!(sink.len(), 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_sentinel_is_counted_not_failed() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,NaN\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.sentinel_nulls, 1);
    assert!(report.is_clean());
    assert!(!sink.get("D-1_1").unwrap().contains_key("quantity"));
}

#[tokio::test]
async fn test_null_field_policy_keeps_record() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,abc\n";

    let report = small_pipeline(policy(FieldErrorPolicy::NullField))
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.fields_nulled, 1);
    assert_eq!(report.records_written, 1);
    assert!(!report.is_clean());
    let document = sink.get("D-1_1").unwrap();
    assert!(!document.contains_key("quantity"));
    assert_eq!(document["declaration_number"], "D-1");
}

#[tokio::test]
async fn test_skip_record_policy_drops_record() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,abc\nD-1,2,4\n";

    let report = small_pipeline(policy(FieldErrorPolicy::SkipRecord))
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.records_written, 1);
    assert!(sink.get("D-1_1").is_none());
    assert_eq!(report.failed_lines(), 1);
}

#[tokio::test]
async fn test_abort_policy_stops_run() {
    let mut sink = MemorySink::new();
    let source = "D-1,1,4\nD-1,2,abc\nD-1,3,5\n";

    let error = small_pipeline(policy(FieldErrorPolicy::Abort))
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        Error::Parse { line, field, .. } => {
            assert_eq!(line, 2);
            assert_eq!(field, "quantity");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.get("D-1_3").is_none());
}

#[tokio::test]
async fn test_missing_identity_skips_record() {
    let mut sink = MemorySink::new();
    let source = "D-1,,4\n,2,5\nD-1,3,6\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.identity_failures, 2);
    assert_eq!(report.records_written, 1);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_batches_follow_batch_size() {
    let mut sink = MemorySink::new();
    let source: String = (1..=5).map(|item| format!("D-1,{item},1\n")).collect();

    let report = small_pipeline(IngestPolicy::default())
        .with_batch_size(2)
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.batches_sent, 3);
    assert_eq!(sink.batch_count(), 3);
    assert_eq!(sink.len(), 5);
}

#[tokio::test]
async fn test_cancelled_run_stops_before_reading() {
    let mut sink = MemorySink::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = small_pipeline(IngestPolicy::default())
        .run("D-1,1,1\nD-1,2,2\n".as_bytes(), &mut sink, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.lines_read, 0);
    assert!(sink.is_empty());
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_cancel_mid_run_leaves_next_line_unread() {
    let cancel = CancellationToken::new();
    let mut sink = CancellingSink {
        cancel: cancel.clone(),
        written: 0,
    };
    let source = LineByLine::new("D-1,1,1\nD-1,2,2\nD-1,3,3\n");
    let handed_out = source.handed_out.clone();

    let report = small_pipeline(IngestPolicy::default())
        .with_batch_size(1)
        .run(source, &mut sink, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.lines_read, 1);
    assert_eq!(report.records_written, 1);
    assert_eq!(sink.written, 1);
    assert_eq!(handed_out.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sink_rejections_are_counted() {
    let mut sink = RejectingSink::refusing(&["D-1_2"]);
    let source = "D-1,1,1\nD-1,2,2\nD-1,3,3\n";

    let report = small_pipeline(IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.sink_rejections, 1);
    assert_eq!(report.records_written, 2);
    assert_eq!(sink.accepted, vec!["D-1_1", "D-1_3"]);
    assert!(report.issues.iter().any(|issue| issue.contains("D-1_2")));
}

#[tokio::test]
async fn test_sink_failure_aborts_run() {
    let mut sink = FailingSink;

    let error = small_pipeline(IngestPolicy::default())
        .run("D-1,1,1\n".as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Sink { .. }));
}

#[tokio::test]
async fn test_issue_list_is_capped() {
    let mut sink = MemorySink::new();
    let source: String = (1..=4).map(|item| format!("D-1,{item}\n")).collect();

    let report = small_pipeline(IngestPolicy::default())
        .with_max_reported_issues(2)
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.format_errors, 4);
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.issues_truncated, 2);
}

#[tokio::test]
async fn test_customs_line_through_pipeline() {
    use crate::app::services::record_decoder::tests::sample_line;

    let mut sink = MemorySink::new();
    let schema = Arc::new(RecordSchema::customs_declarations());
    let source = format!("{}\n", sample_line());

    let report = IngestPipeline::new(schema, IngestPolicy::default())
        .run(source.as_bytes(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_clean());
    let document = sink.get("12345/010124/0000001_1").unwrap();
    assert_eq!(document["processing_date"], "2024-01-01");
    assert_eq!(document["item_number"], 1);
    assert!(!document.contains_key("special_mark"));
}
