//! Test utilities for the field normalizer

use std::sync::Arc;

use crate::app::models::RawRecord;
use crate::schema::{FieldSpec, FieldType, RecordSchema};

use super::{FieldNormalizer, NormalizerOptions};


/// Small schema covering every field type
pub fn mixed_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new(vec![
            FieldSpec::new("declaration_number", FieldType::Keyword),
            FieldSpec::new("item_number", FieldType::Integer),
            FieldSpec::new("processing_date", FieldType::Date),
            FieldSpec::new("sender", FieldType::Text),
            FieldSpec::new("quantity", FieldType::Float),
            FieldSpec::new("gross_weight", FieldType::Float),
        ])
        .unwrap(),
    )
}

/// Raw record over `mixed_schema` with the given tokens
pub fn mixed_raw(tokens: [&str; 6]) -> RawRecord {
    let values = mixed_schema()
        .field_names()
        .into_iter()
        .zip(tokens)
        .map(|(name, token)| (name.to_string(), token.to_string()))
        .collect();
    RawRecord::new(1, values)
}

pub fn normalizer_with(options: NormalizerOptions) -> FieldNormalizer {
    FieldNormalizer::new(mixed_schema(), options)
}

pub fn default_normalizer() -> FieldNormalizer {
    normalizer_with(NormalizerOptions::default())
}
