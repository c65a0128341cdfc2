//! Test utilities for the ingestion pipeline

use async_trait::async_trait;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use super::{IngestPipeline, IngestPolicy};
use crate::Result;
use crate::app::services::index_writer::{BatchOutcome, IndexDocument, IndexSink, RejectedDocument};
use crate::schema::{FieldSpec, FieldType, RecordSchema};

// Test modules
mod pipeline_tests;

/// Identity fields plus one float
pub fn small_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new(vec![
            FieldSpec::new("declaration_number", FieldType::Keyword),
            FieldSpec::new("item_number", FieldType::Integer),
            FieldSpec::new("quantity", FieldType::Float),
        ])
        .unwrap(),
    )
}

pub fn small_pipeline(policy: IngestPolicy) -> IngestPipeline {
    IngestPipeline::new(small_schema(), policy)
}

/// Sink refusing the listed identities and accepting everything else
#[derive(Debug, Default)]
pub struct RejectingSink {
    pub refused: Vec<String>,
    pub accepted: Vec<String>,
}

impl RejectingSink {
    pub fn refusing(ids: &[&str]) -> Self {
        Self {
            refused: ids.iter().map(|id| id.to_string()).collect(),
            accepted: Vec::new(),
        }
    }
}

#[async_trait]
impl IndexSink for RejectingSink {
    async fn ensure_index(&mut self, _mapping: &Value) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for document in documents {
            if self.refused.contains(&document.id) {
                outcome.rejected.push(RejectedDocument {
                    id: document.id,
                    line_number: document.line_number,
                    status: 400,
                    reason: "mapper_parsing_exception: refused".to_string(),
                });
            } else {
                self.accepted.push(document.id);
                outcome.written += 1;
            }
        }
        Ok(outcome)
    }
}

/// Sink whose every request fails
#[derive(Debug, Default)]
pub struct FailingSink;

#[async_trait]
impl IndexSink for FailingSink {
    async fn ensure_index(&mut self, _mapping: &Value) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&mut self, _documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        Err(crate::Error::sink("bulk request failed with status 503"))
    }
}

/// Sink cancelling the run once its first batch is written
#[derive(Debug)]
pub struct CancellingSink {
    pub cancel: CancellationToken,
    pub written: usize,
}

#[async_trait]
impl IndexSink for CancellingSink {
    async fn ensure_index(&mut self, _mapping: &Value) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        self.written += documents.len();
        self.cancel.cancel();
        Ok(BatchOutcome {
            written: documents.len(),
            ..BatchOutcome::default()
        })
    }
}

/// Reader handing out one line per `read` call and counting the lines given
pub struct LineByLine {
    lines: Vec<Vec<u8>>,
    next: usize,
    pub handed_out: Arc<AtomicUsize>,
}

impl LineByLine {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source
                .split_inclusive('\n')
                .map(|line| line.as_bytes().to_vec())
                .collect(),
            next: 0,
            handed_out: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Read for LineByLine {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let Some(line) = self.lines.get(self.next) else {
            return Ok(0);
        };
        assert!(buf.len() >= line.len(), "read buffer smaller than one line");
        buf[..line.len()].copy_from_slice(line);
        self.next += 1;
        self.handed_out.fetch_add(1, Ordering::SeqCst);
        Ok(line.len())
    }
}
