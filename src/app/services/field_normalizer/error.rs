//! Per-field coercion failures

use thiserror::Error;

use crate::Error as IngestError;
use crate::schema::FieldType;

/// A field whose text could not be coerced to its declared type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field '{field}' = '{value}' is not a valid {expected}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub value: String,
    pub expected: FieldType,
    pub reason: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: FieldType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            expected,
            reason: reason.into(),
        }
    }

    /// Promote to a crate error attributed to a source line
    pub fn into_error(self, line: u64) -> IngestError {
        let message = format!(
            "'{}' is not a valid {}: {}",
            self.value, self.expected, self.reason
        );
        IngestError::parse(line, self.field, message)
    }
}
