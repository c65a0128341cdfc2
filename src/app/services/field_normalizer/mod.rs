//! Field normalization for decoded customs records
//!
//! Turns the raw tokens of a [`RawRecord`](crate::app::models::RawRecord)
//! into typed [`FieldValue`](crate::app::models::FieldValue)s. Every field
//! goes through the same three passes, in order:
//!
//! 1. **Decimal normalization** - commas become periods (scope configurable)
//! 2. **Sentinel nulling** - the literal `NaN` marker becomes an absent field
//! 3. **Typed coercion** - date, integer and float fields are parsed; keyword
//!    and text fields pass through
//!
//! Coercion failures are collected per field rather than aborting the
//! record; the caller applies its own policy to them.
//!
//! ## Architecture
//!
//! - [`normalizer`] - Pass orchestration and options
//! - [`field_parsers`] - Date, integer and float coercion
//! - [`error`] - Per-field coercion failures

pub mod error;
pub mod field_parsers;
pub mod normalizer;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use error::FieldError;
pub use normalizer::{CommaScope, FieldNormalizer, NormalizedOutcome, NormalizerOptions};
