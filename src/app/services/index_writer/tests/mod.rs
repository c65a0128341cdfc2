//! Test utilities for the index writer

use serde_json::{Map, Value, json};

use super::IndexDocument;
use crate::config::OpenSearchConfig;

// Test modules
mod buffer_tests;

pub fn document(id: &str, line_number: u64, quantity: f64) -> IndexDocument {
    let mut body = Map::new();
    body.insert("declaration_number".to_string(), json!(id));
    body.insert("quantity".to_string(), Value::from(quantity));
    IndexDocument {
        id: id.to_string(),
        line_number,
        body,
    }
}

/// Sink configuration pointed at a mock server
pub fn mock_config(url: &str) -> OpenSearchConfig {
    OpenSearchConfig {
        url: url.to_string(),
        index: "customs_declarations".to_string(),
        timeout_secs: 5,
        ..OpenSearchConfig::default()
    }
}
