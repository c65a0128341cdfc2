//! Counting sink
//!
//! Accepts every document and keeps only totals, so a dry run over a large
//! export holds no document bodies or identities in memory.

use async_trait::async_trait;
use serde_json::Value;

use super::{BatchOutcome, IndexDocument, IndexSink};
use crate::Result;

#[derive(Debug, Default)]
pub struct CountingSink {
    index_ensured: bool,
    batches: usize,
    writes: usize,
    body_bytes: u64,
    closed: bool,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ensure_index` was called
    pub fn index_ensured(&self) -> bool {
        self.index_ensured
    }

    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Total documents written, overwrites included
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Serialized size of every document body written
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl IndexSink for CountingSink {
    async fn ensure_index(&mut self, _mapping: &Value) -> Result<()> {
        self.index_ensured = true;
        Ok(())
    }

    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        self.batches += 1;
        for document in &documents {
            self.body_bytes += serde_json::to_vec(&document.body)?.len() as u64;
        }
        self.writes += documents.len();

        Ok(BatchOutcome {
            written: documents.len(),
            rejected: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
