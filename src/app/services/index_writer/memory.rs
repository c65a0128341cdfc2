//! In-memory sink
//!
//! Stores documents by identity with last-writer-wins semantics, the same
//! overwrite behaviour the search index applies to repeated keys.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{BatchOutcome, IndexDocument, IndexSink};
use crate::Result;

#[derive(Debug, Default)]
pub struct MemorySink {
    documents: BTreeMap<String, Map<String, Value>>,
    mapping: Option<Value>,
    batches: usize,
    writes: usize,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Map<String, Value>> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> &BTreeMap<String, Map<String, Value>> {
        &self.documents
    }

    /// Number of distinct identities stored
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Creation body passed to `ensure_index`, if any
    pub fn mapping(&self) -> Option<&Value> {
        self.mapping.as_ref()
    }

    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Total documents written, overwrites included
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl IndexSink for MemorySink {
    async fn ensure_index(&mut self, mapping: &Value) -> Result<()> {
        if self.mapping.is_none() {
            self.mapping = Some(mapping.clone());
        }
        Ok(())
    }

    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        self.batches += 1;
        let written = documents.len();

        for document in documents {
            self.documents.insert(document.id, document.body);
        }
        self.writes += written;

        Ok(BatchOutcome {
            written,
            rejected: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
