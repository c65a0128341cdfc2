//! Line-level decode failures

use thiserror::Error;

use crate::Error as IngestError;

/// Failure to decode one source line
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Token count differs from the schema length
    #[error("line {line}: expected {expected} fields, found {found}")]
    Format {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Line is not valid UTF-8
    #[error("line {line}: invalid UTF-8 ({message})")]
    Encoding { line: u64, message: String },

    /// Underlying reader failed; the stream cannot continue
    #[error("reader failure after line {line}: {source}")]
    Reader {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

impl DecodeError {
    /// Line the failure is attributed to
    pub fn line(&self) -> u64 {
        match self {
            DecodeError::Format { line, .. }
            | DecodeError::Encoding { line, .. }
            | DecodeError::Reader { line, .. } => *line,
        }
    }

    /// Whether the stream can continue with the next line
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DecodeError::Reader { .. })
    }
}

impl From<DecodeError> for IngestError {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::Format {
                line,
                expected,
                found,
            } => IngestError::format(line, expected, found),
            DecodeError::Encoding { line, message } => IngestError::encoding(line, message),
            DecodeError::Reader { line, source } => {
                IngestError::csv(format!("Source reader failed after line {}", line), source)
            }
        }
    }
}
