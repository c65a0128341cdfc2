//! Core data models for customs declaration ingestion
//!
//! This module contains the record types that flow through the pipeline:
//! the raw positional tokens produced by the decoder, the typed field
//! values produced by the normalizer, and the document rendering handed
//! to the index sink.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{
    IDENTITY_DECLARATION_FIELD, IDENTITY_ITEM_FIELD, IDENTITY_SEPARATOR, INDEX_DATE_FORMAT,
};
use crate::{Error, Result};

/// Raw decoded line: field names zipped with untyped tokens in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the source
    pub line_number: u64,

    /// Field name to raw token pairs, in positional order
    pub values: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(line_number: u64, values: Vec<(String, String)>) -> Self {
        Self {
            line_number,
            values,
        }
    }

    /// Raw token for a named field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Tokens in positional order
    pub fn tokens(&self) -> Vec<&str> {
        self.values.iter().map(|(_, value)| value.as_str()).collect()
    }

    /// Join the tokens back together by position
    pub fn rejoin(&self, delimiter: char) -> String {
        self.tokens().join(&delimiter.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Typed value of a normalized field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl FieldValue {
    /// JSON rendering used in indexed documents
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            // Non-finite floats never reach here; the normalizer rejects them
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Date(d) => Value::String(d.format(INDEX_DATE_FORMAT).to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Date(d) => write!(f, "{}", d.format(INDEX_DATE_FORMAT)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// One normalized line item of a customs declaration
///
/// Absent fields (empty tokens, sentinel values, nulled parse failures)
/// are not present in `fields` and are omitted from the indexed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DeclarationRecord {
    /// 1-based line number in the source
    #[serde(skip)]
    pub line_number: u64,

    /// Present fields keyed by name
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl DeclarationRecord {
    pub fn new(line_number: u64) -> Self {
        Self {
            line_number,
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn is_absent(&self, name: &str) -> bool {
        !self.fields.contains_key(name)
    }

    /// Document identity key `<declaration_number>_<item_number>`
    pub fn document_id(&self) -> Result<String> {
        let declaration = self.identity_part(IDENTITY_DECLARATION_FIELD)?;
        let item = self.identity_part(IDENTITY_ITEM_FIELD)?;
        Ok(format!("{}{}{}", declaration, IDENTITY_SEPARATOR, item))
    }

    fn identity_part(&self, field: &str) -> Result<String> {
        let part = self
            .get(field)
            .map(|value| value.to_string())
            .unwrap_or_default();

        if part.trim().is_empty() {
            return Err(Error::missing_identity(self.line_number, field));
        }
        Ok(part)
    }

    /// Render the document body with present fields only
    pub fn to_document(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
