//! Batch accumulation ahead of the sink

use super::IndexDocument;

/// Fixed-size document buffer; hands back a full batch when it fills up
#[derive(Debug)]
pub struct BulkBuffer {
    documents: Vec<IndexDocument>,
    batch_size: usize,
}

impl BulkBuffer {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            documents: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Add a document; returns the batch to write once the buffer is full
    pub fn push(&mut self, document: IndexDocument) -> Option<Vec<IndexDocument>> {
        self.documents.push(document);
        if self.documents.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Drain whatever is buffered
    pub fn take(&mut self) -> Vec<IndexDocument> {
        std::mem::replace(&mut self.documents, Vec::with_capacity(self.batch_size))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
