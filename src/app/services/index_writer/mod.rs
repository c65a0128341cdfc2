//! Index writer: the search-index sink behind the pipeline
//!
//! Normalized records are handed to an [`IndexSink`] as documents keyed by
//! their identity. Writes to the same identity overwrite; the sink's own
//! versioning decides the last writer.
//!
//! ## Architecture
//!
//! - [`buffer`] - Batch accumulation ahead of the sink
//! - [`opensearch`] - HTTP client and bulk sink for OpenSearch
//! - [`memory`] - In-memory sink for tests
//! - [`counting`] - Totals-only sink for dry runs
//!
//! Per-document rejections come back in a [`BatchOutcome`]; failures of the
//! whole request (transport, non-success status) are returned as errors and
//! are not retried here.

pub mod buffer;
pub mod counting;
pub mod memory;
pub mod opensearch;

#[cfg(test)]
pub mod tests;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::app::models::DeclarationRecord;

// Re-export main types for easy access
pub use buffer::BulkBuffer;
pub use counting::CountingSink;
pub use memory::MemorySink;
pub use opensearch::{ClusterInfo, OpenSearchClient, OpenSearchSink};

/// One document addressed by its identity key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub id: String,
    pub line_number: u64,
    pub body: Map<String, Value>,
}

impl IndexDocument {
    /// Build a document from a normalized record
    pub fn from_record(record: &DeclarationRecord) -> Result<Self> {
        Ok(Self {
            id: record.document_id()?,
            line_number: record.line_number,
            body: record.to_document(),
        })
    }
}

/// A document the sink refused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedDocument {
    pub id: String,
    pub line_number: u64,
    pub status: u16,
    pub reason: String,
}

/// Result of writing one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Documents durably accepted by the sink
    pub written: usize,
    pub rejected: Vec<RejectedDocument>,
}

/// Destination for normalized documents
#[async_trait]
pub trait IndexSink: Send {
    /// Make sure the target index exists with the given creation body
    async fn ensure_index(&mut self, mapping: &Value) -> Result<()>;

    /// Write a batch of documents, reporting per-document rejections
    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome>;

    /// Release resources after the final batch
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
