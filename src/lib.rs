//! Customs Ingest Library
//!
//! A Rust library for loading headerless customs-declaration CSV exports into
//! an OpenSearch index with a fixed, typed document schema.
//!
//! This library provides tools for:
//! - Decoding delimited source lines against an explicit positional schema
//! - Normalizing locale-formatted decimals, sentinel values and dates
//! - Coercing fields to the types declared in the index mapping
//! - Writing documents keyed by `<declaration_number>_<item_number>`
//! - Per-line and per-field error accounting without aborting the stream

pub mod config;
pub mod constants;
pub mod schema;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod field_normalizer;
        pub mod index_writer;
        pub mod ingest_pipeline;
        pub mod record_decoder;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{DeclarationRecord, FieldValue, RawRecord};
pub use config::Config;
pub use schema::{FieldSpec, FieldType, RecordSchema};

/// Result type alias for the customs ingest pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for customs ingestion operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV reader failure that is not attributable to a single line
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: csv::Error,
    },

    /// Source line did not split into the expected number of tokens
    #[error("Format error at line {line}: expected {expected} fields, found {found}")]
    Format {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Source line is not valid UTF-8
    #[error("Encoding error at line {line}: {message}")]
    Encoding { line: u64, message: String },

    /// Field text could not be coerced to its declared type
    #[error("Parse error at line {line}, field '{field}': {message}")]
    Parse {
        line: u64,
        field: String,
        message: String,
    },

    /// Record cannot be addressed in the sink
    #[error("Missing identity at line {line}: field '{field}' is absent")]
    MissingIdentity { line: u64, field: String },

    /// Field schema is invalid
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Sink rejected or could not accept a write
    #[error("Sink error: {message}")]
    Sink { message: String },

    /// HTTP transport failure talking to the sink
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// JSON (de)serialization failure
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// TOML parsing failure
    #[error("TOML error in '{file}': {message}")]
    Toml {
        file: String,
        message: String,
        #[source]
        source: toml::de::Error,
    },

    /// Processing interrupted
    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV reader error with context
    pub fn csv(message: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            message: message.into(),
            source,
        }
    }

    /// Create a format error for a source line
    pub fn format(line: u64, expected: usize, found: usize) -> Self {
        Self::Format {
            line,
            expected,
            found,
        }
    }

    /// Create an encoding error for a source line
    pub fn encoding(line: u64, message: impl Into<String>) -> Self {
        Self::Encoding {
            line,
            message: message.into(),
        }
    }

    /// Create a field parse error
    pub fn parse(line: u64, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a missing identity error
    pub fn missing_identity(line: u64, field: impl Into<String>) -> Self {
        Self::MissingIdentity {
            line,
            field: field.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create an HTTP error with context
    pub fn http(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            message: message.into(),
            source,
        }
    }

    /// Create a JSON error with context
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            message: message.into(),
            source,
        }
    }

    /// Create a TOML error for a file
    pub fn toml(file: impl Into<String>, source: toml::de::Error) -> Self {
        Self::Toml {
            file: file.into(),
            message: source.message().to_string(),
            source,
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }

    /// Whether this error must stop the whole run rather than a single line
    pub fn is_critical(&self) -> bool {
        !matches!(
            self,
            Error::Format { .. }
                | Error::Encoding { .. }
                | Error::Parse { .. }
                | Error::MissingIdentity { .. }
        )
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::Csv {
            message: "CSV reading failed".to_string(),
            source: error,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Http {
            message: "HTTP request failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: "JSON processing failed".to_string(),
            source: error,
        }
    }
}
