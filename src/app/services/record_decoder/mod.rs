//! Record decoder for headerless customs-declaration exports
//!
//! Splits each source line on the delimiter and zips the tokens against the
//! field names of a [`RecordSchema`](crate::schema::RecordSchema), in order.
//! The source has no header line; the first line is data.
//!
//! ## Architecture
//!
//! - [`decoder`] - Line splitting, token-count checks and streaming over a reader
//! - [`error`] - Line-level decode failures
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use customs_ingest::app::services::record_decoder::RecordDecoder;
//! use customs_ingest::schema::{FieldSpec, FieldType, RecordSchema};
//!
//! let schema = RecordSchema::new(vec![
//!     FieldSpec::new("declaration_number", FieldType::Keyword),
//!     FieldSpec::new("item_number", FieldType::Integer),
//! ])
//! .unwrap();
//! let decoder = RecordDecoder::new(Arc::new(schema));
//!
//! let raw = decoder.decode_line("D-1,3", 1).unwrap();
//! assert_eq!(raw.get("item_number"), Some("3"));
//! ```

pub mod decoder;
pub mod error;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use decoder::{DecodedRecords, RecordDecoder};
pub use error::DecodeError;
