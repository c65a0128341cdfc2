//! Integration tests for ingestion into a mock OpenSearch cluster
//!
//! A wiremock server stands in for the cluster so the full path from source
//! bytes to bulk NDJSON can be checked without a running service.

use customs_ingest::app::services::index_writer::{IndexSink, OpenSearchClient, OpenSearchSink};
use customs_ingest::app::services::ingest_pipeline::{IngestPipeline, IngestPolicy};
use customs_ingest::config::OpenSearchConfig;
use customs_ingest::schema::{FieldSpec, FieldType, RecordSchema, index_mapping};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn small_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new(vec![
            FieldSpec::new("declaration_number", FieldType::Keyword),
            FieldSpec::new("item_number", FieldType::Integer),
            FieldSpec::new("quantity", FieldType::Float),
        ])
        .unwrap(),
    )
}

fn sink_for(server: &MockServer) -> OpenSearchSink {
    let config = OpenSearchConfig {
        url: server.uri(),
        timeout_secs: 5,
        ..OpenSearchConfig::default()
    };
    OpenSearchSink::new(OpenSearchClient::new(&config).unwrap(), true)
}

fn bulk_response(statuses: &[u16]) -> Value {
    let items: Vec<Value> = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            if *status < 300 {
                json!({ "index": { "_id": format!("D-1_{}", i + 1), "status": status } })
            } else {
                json!({ "index": {
                    "_id": format!("D-1_{}", i + 1),
                    "status": status,
                    "error": {
                        "type": "mapper_parsing_exception",
                        "reason": "failed to parse [quantity]"
                    }
                } })
            }
        })
        .collect();
    json!({
        "took": 1,
        "errors": statuses.iter().any(|status| *status >= 300),
        "items": items
    })
}

#[tokio::test]
async fn test_ingest_creates_index_and_writes_bulk() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/customs_declarations"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/customs_declarations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_response(&[201, 201])))
        .expect(1)
        .mount(&server)
        .await;

    let schema = small_schema();
    let mut sink = sink_for(&server);
    sink.ensure_index(&index_mapping(&schema)).await.unwrap();

    let report = IngestPipeline::new(schema, IngestPolicy::default())
        .run(
            "D-1,1,\"12,5\"\nD-1,2,NaN\n".as_bytes(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.batches_sent, 1);

    let requests = server.received_requests().await.unwrap();
    let bulk = requests
        .iter()
        .find(|request| request.url.path() == "/_bulk")
        .unwrap();
    let body = String::from_utf8(bulk.body.clone()).unwrap();
    let lines: Vec<Value> = body
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["index"]["_id"], "D-1_1");
    assert_eq!(lines[1]["quantity"], 12.5);
    assert_eq!(lines[2]["index"]["_id"], "D-1_2");
    assert!(lines[3].get("quantity").is_none());
}

#[tokio::test]
async fn test_ingest_counts_rejected_documents() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_response(&[201, 400, 201])))
        .mount(&server)
        .await;

    let mut sink = sink_for(&server);
    let report = IngestPipeline::new(small_schema(), IngestPolicy::default())
        .run(
            "D-1,1,1\nD-1,2,2\nD-1,3,3\n".as_bytes(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.sink_rejections, 1);
    assert_eq!(report.failed_lines(), 1);
    assert!(report.issues.iter().any(|issue| issue.contains("D-1_2")));
}

#[tokio::test]
async fn test_ingest_aborts_when_cluster_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let mut sink = sink_for(&server);
    let error = IngestPipeline::new(small_schema(), IngestPolicy::default())
        .with_batch_size(1)
        .run(
            "D-1,1,1\nD-1,2,2\n".as_bytes(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(error.is_critical());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
