//! Field schema and index mapping.
//!
//! The positional layout of a source line is an explicit [`RecordSchema`]
//! value shared by the decoder and the normalizer. The same schema renders
//! the OpenSearch index mapping, so the types produced at ingest time and
//! the types declared by the sink cannot drift apart.

use crate::constants::{
    COMMA_ANALYZER, COMMA_CHAR_FILTER, DECLARATION_FIELD_NAMES, IDENTITY_DECLARATION_FIELD,
    IDENTITY_ITEM_FIELD, INDEX_DATE_MAPPING_FORMAT,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Declared type of a document field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Exact-match identifier or category
    Keyword,
    /// Analyzed free text
    Text,
    /// Calendar date in `dd.MM.yy` source form
    Date,
    /// Whole number
    Integer,
    /// Decimal measure
    Float,
}

impl FieldType {
    /// OpenSearch mapping type name
    pub fn as_mapping_type(&self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
        }
    }

    /// Whether values of this type are coerced from text rather than passed through
    pub fn is_coerced(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Integer | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mapping_type())
    }
}

/// One named, typed position in a source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field schema; position N of a source line maps to `fields[N]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema, validating names and identity fields
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::schema("Schema must declare at least one field"));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(Error::schema("Field names cannot be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::schema(format!(
                    "Duplicate field name '{}'",
                    field.name
                )));
            }
        }

        for identity in [IDENTITY_DECLARATION_FIELD, IDENTITY_ITEM_FIELD] {
            if !seen.contains(identity) {
                return Err(Error::schema(format!(
                    "Schema is missing identity field '{}'",
                    identity
                )));
            }
        }

        Ok(Self { fields })
    }

    /// The 36-field customs-declaration export layout
    pub fn customs_declarations() -> Self {
        let fields = DECLARATION_FIELD_NAMES
            .iter()
            .map(|name| FieldSpec::new(*name, declaration_field_type(name)))
            .collect();
        Self { fields }
    }

    /// Load a schema from a TOML file of `[[fields]]` tables
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read schema file {}", path.display()), e)
        })?;
        let schema = Self::from_toml_str(&content, &path.display().to_string())?;
        debug!(
            "Loaded schema with {} fields from {}",
            schema.len(),
            path.display()
        );
        Ok(schema)
    }

    /// Parse a schema from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content).map_err(|e| Error::toml(origin, e))?;
        Self::new(file.fields)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Declared type of a named field
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Position of a named field in the source line
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::customs_declarations()
    }
}

/// Declared type of a field in the customs-declaration layout
fn declaration_field_type(name: &str) -> FieldType {
    match name {
        "processing_date" => FieldType::Date,
        "item_number" => FieldType::Integer,
        "sender" | "recipient" | "product_description" | "delivery_location" => FieldType::Text,
        "customs_office" | "declaration_type" | "declaration_number" | "recipient_code"
        | "product_code" | "trading_country" | "shipping_country" | "origin_country"
        | "delivery_terms" | "unit" | "special_mark" | "contract_type" | "trade_mark" => {
            FieldType::Keyword
        }
        _ => FieldType::Float,
    }
}

/// Build the index creation body (settings and mappings) for a schema
///
/// Text fields are analyzed with a character filter that rewrites commas to
/// periods before tokenization. It backs up the ingest-time rewrite for any
/// value that reached the index without passing through the normalizer.
pub fn index_mapping(schema: &RecordSchema) -> Value {
    let mut properties = Map::new();

    for field in schema.iter() {
        let property = match field.field_type {
            FieldType::Text => json!({
                "type": "text",
                "analyzer": COMMA_ANALYZER,
            }),
            FieldType::Date => json!({
                "type": "date",
                "format": INDEX_DATE_MAPPING_FORMAT,
            }),
            other => json!({ "type": other.as_mapping_type() }),
        };
        properties.insert(field.name.clone(), property);
    }

    json!({
        "settings": {
            "analysis": {
                "char_filter": {
                    COMMA_CHAR_FILTER: {
                        "type": "mapping",
                        "mappings": [", => ."],
                    }
                },
                "analyzer": {
                    COMMA_ANALYZER: {
                        "type": "custom",
                        "char_filter": [COMMA_CHAR_FILTER],
                        "tokenizer": "standard",
                        "filter": ["lowercase"],
                    }
                }
            }
        },
        "mappings": {
            "properties": properties,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DECLARATION_FIELD_COUNT;

    #[test]
    fn test_customs_schema_layout() {
        let schema = RecordSchema::customs_declarations();

        assert_eq!(schema.len(), DECLARATION_FIELD_COUNT);
        assert_eq!(schema.position("customs_office"), Some(0));
        assert_eq!(schema.position("processing_date"), Some(3));
        assert_eq!(schema.position("item_number"), Some(7));
        assert_eq!(schema.position("full_rate"), Some(35));
    }

    #[test]
    fn test_customs_schema_types() {
        let schema = RecordSchema::customs_declarations();

        assert_eq!(schema.field_type("processing_date"), Some(FieldType::Date));
        assert_eq!(schema.field_type("item_number"), Some(FieldType::Integer));
        assert_eq!(schema.field_type("sender"), Some(FieldType::Text));
        assert_eq!(
            schema.field_type("declaration_number"),
            Some(FieldType::Keyword)
        );
        assert_eq!(schema.field_type("unit"), Some(FieldType::Keyword));
        assert_eq!(schema.field_type("quantity"), Some(FieldType::Float));
        assert_eq!(schema.field_type("full_rate"), Some(FieldType::Float));
        assert_eq!(schema.field_type("no_such_field"), None);

        let floats = schema
            .iter()
            .filter(|f| f.field_type == FieldType::Float)
            .count();
        let keywords = schema
            .iter()
            .filter(|f| f.field_type == FieldType::Keyword)
            .count();
        assert_eq!(floats, 17);
        assert_eq!(keywords, 13);
    }

    #[test]
    fn test_schema_rejects_duplicates_and_missing_identity() {
        let duplicate = RecordSchema::new(vec![
            FieldSpec::new("declaration_number", FieldType::Keyword),
            FieldSpec::new("item_number", FieldType::Integer),
            FieldSpec::new("item_number", FieldType::Integer),
        ]);
        assert!(matches!(duplicate, Err(Error::Schema { .. })));

        let no_identity = RecordSchema::new(vec![FieldSpec::new("sender", FieldType::Text)]);
        assert!(matches!(no_identity, Err(Error::Schema { .. })));

        assert!(RecordSchema::new(vec![]).is_err());
    }

    #[test]
    fn test_schema_from_toml() {
        let content = r#"
[[fields]]
name = "declaration_number"
type = "keyword"

[[fields]]
name = "item_number"
type = "integer"

[[fields]]
name = "quantity"
type = "float"
"#;
        let schema = RecordSchema::from_toml_str(content, "inline").unwrap();
        assert_eq!(
            schema.field_names(),
            vec!["declaration_number", "item_number", "quantity"]
        );
        assert_eq!(schema.field_type("quantity"), Some(FieldType::Float));
    }

    #[test]
    fn test_schema_from_toml_rejects_unknown_type() {
        let content = r#"
[[fields]]
name = "declaration_number"
type = "uuid"
"#;
        assert!(matches!(
            RecordSchema::from_toml_str(content, "inline"),
            Err(Error::Toml { .. })
        ));
    }

    #[test]
    fn test_index_mapping_properties() {
        let mapping = index_mapping(&RecordSchema::customs_declarations());
        let properties = &mapping["mappings"]["properties"];

        assert_eq!(properties.as_object().unwrap().len(), DECLARATION_FIELD_COUNT);
        assert_eq!(properties["customs_office"]["type"], "keyword");
        assert_eq!(properties["item_number"]["type"], "integer");
        assert_eq!(properties["gross_weight"]["type"], "float");
        assert_eq!(properties["processing_date"]["type"], "date");
        assert_eq!(properties["sender"]["type"], "text");
        assert_eq!(properties["sender"]["analyzer"], COMMA_ANALYZER);
    }

    #[test]
    fn test_index_mapping_comma_analyzer() {
        let mapping = index_mapping(&RecordSchema::customs_declarations());
        let analysis = &mapping["settings"]["analysis"];

        assert_eq!(analysis["char_filter"][COMMA_CHAR_FILTER]["type"], "mapping");
        assert_eq!(
            analysis["char_filter"][COMMA_CHAR_FILTER]["mappings"][0],
            ", => ."
        );
        assert_eq!(
            analysis["analyzer"][COMMA_ANALYZER]["char_filter"][0],
            COMMA_CHAR_FILTER
        );
    }
}
