//! Test utilities for the record decoder
//!
//! Builders for well-formed 36-token customs lines shared by the decoder
//! test modules.

use std::sync::Arc;

use crate::schema::RecordSchema;

use super::RecordDecoder;


/// Tokens for one well-formed customs-declaration line
pub fn sample_tokens() -> Vec<String> {
    [
        "0410002",
        "ИМ40",
        "12345/010124/0000001",
        "01.01.24",
        "ACME LLC",
        "RU001",
        "Recipient Co",
        "1",
        "8471300000",
        "Laptop",
        "RU",
        "RU",
        "CN",
        "FCA",
        "Moscow",
        "100",
        "796",
        "1500",
        "1450",
        "1400",
        "25000",
        "",
        "17.24",
        "14.5",
        "50",
        "ЕК",
        "ACME",
        "17.24",
        "250",
        "16.67",
        "5",
        "12.24",
        "17.24",
        "0",
        "0",
        "10",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// One well-formed line joined with commas
pub fn sample_line() -> String {
    sample_tokens().join(",")
}

pub fn customs_decoder() -> RecordDecoder {
    RecordDecoder::new(Arc::new(RecordSchema::customs_declarations()))
}
