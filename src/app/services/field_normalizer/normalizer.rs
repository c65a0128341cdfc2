//! Field normalizer orchestration
//!
//! Applies decimal normalization, sentinel nulling and typed coercion to
//! every field of a raw record. The transform is pure: one raw record in,
//! one normalized record plus its field-level diagnostics out.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::error::FieldError;
use super::field_parsers::coerce;
use crate::app::models::{DeclarationRecord, RawRecord};
use crate::constants::MISSING_VALUE_SENTINEL;
use crate::schema::{FieldType, RecordSchema};

/// Which fields receive the comma-to-period rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommaScope {
    /// Every field, free text included (matches the source export tooling)
    #[default]
    AllFields,
    /// Only date, integer and float fields
    NumericOnly,
}

impl CommaScope {
    fn applies_to(&self, field_type: FieldType) -> bool {
        match self {
            CommaScope::AllFields => true,
            CommaScope::NumericOnly => field_type.is_coerced(),
        }
    }
}

/// Normalizer options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerOptions {
    pub comma_scope: CommaScope,
    /// Literal text standing in for missing data
    pub sentinel: String,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            comma_scope: CommaScope::default(),
            sentinel: MISSING_VALUE_SENTINEL.to_string(),
        }
    }
}

/// Normalized record plus the field-level diagnostics of producing it
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOutcome {
    /// Record with every successfully coerced field; failed fields are absent
    pub record: DeclarationRecord,

    /// Fields that failed coercion
    pub errors: Vec<FieldError>,

    /// Fields set absent because they held the sentinel
    pub sentinel_fields: Vec<String>,
}

impl NormalizedOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-field normalizer driven by an explicit schema
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    schema: Arc<RecordSchema>,
    options: NormalizerOptions,
}

impl FieldNormalizer {
    pub fn new(schema: Arc<RecordSchema>, options: NormalizerOptions) -> Self {
        Self { schema, options }
    }

    /// Normalize every field of a raw record
    pub fn normalize(&self, raw: &RawRecord) -> NormalizedOutcome {
        let mut record = DeclarationRecord::new(raw.line_number);
        let mut errors = Vec::new();
        let mut sentinel_fields = Vec::new();

        for (name, token) in &raw.values {
            // Fields unknown to the schema are treated as keywords
            let field_type = self.schema.field_type(name).unwrap_or(FieldType::Keyword);

            let Some(text) = self.normalize_text(token, field_type) else {
                continue;
            };

            if text == self.options.sentinel {
                sentinel_fields.push(name.clone());
                continue;
            }

            match coerce(name, &text, field_type) {
                Ok(value) => record.insert(name.clone(), value),
                Err(error) => {
                    debug!("Line {}: {}", raw.line_number, error);
                    errors.push(error);
                }
            }
        }

        NormalizedOutcome {
            record,
            errors,
            sentinel_fields,
        }
    }

    /// Decimal normalization; `None` means the token carries no value
    fn normalize_text(&self, token: &str, field_type: FieldType) -> Option<String> {
        if token.is_empty() || (field_type.is_coerced() && token.trim().is_empty()) {
            return None;
        }

        if self.options.comma_scope.applies_to(field_type) && token.contains(',') {
            Some(token.replace(',', "."))
        } else {
            Some(token.to_string())
        }
    }
}
