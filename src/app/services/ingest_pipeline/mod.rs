//! Ingestion pipeline for customs-declaration exports
//!
//! Wires the [`RecordDecoder`](crate::app::services::record_decoder::RecordDecoder),
//! the [`FieldNormalizer`](crate::app::services::field_normalizer::FieldNormalizer)
//! and an [`IndexSink`](crate::app::services::index_writer::IndexSink) into a
//! single-pass, line-at-a-time stream.
//!
//! # Error Policy
//!
//! - **Format errors** (wrong token count, bad encoding) skip the line, or
//!   abort the run when strict format checking is on
//! - **Field parse errors** null the field, skip the record, or abort,
//!   per [`FieldErrorPolicy`]
//! - **Sink errors** on a whole request abort the run; per-document
//!   rejections are counted and the run continues
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use customs_ingest::app::services::index_writer::MemorySink;
//! use customs_ingest::app::services::ingest_pipeline::{IngestPipeline, IngestPolicy};
//! use customs_ingest::schema::{FieldSpec, FieldType, RecordSchema};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> customs_ingest::Result<()> {
//! let schema = Arc::new(RecordSchema::new(vec![
//!     FieldSpec::new("declaration_number", FieldType::Keyword),
//!     FieldSpec::new("item_number", FieldType::Integer),
//!     FieldSpec::new("quantity", FieldType::Float),
//! ])?);
//! let pipeline = IngestPipeline::new(schema, IngestPolicy::default());
//!
//! let mut sink = MemorySink::new();
//! let source = "D-1,1,\"12,5\"\nD-1,2,NaN\n";
//! let report = pipeline
//!     .run(source.as_bytes(), &mut sink, &CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(report.records_written, 2);
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod report;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use pipeline::{FieldErrorPolicy, IngestPipeline, IngestPolicy};
pub use report::IngestReport;
