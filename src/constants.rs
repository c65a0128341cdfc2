//! Application constants for customs ingest
//!
//! This module contains the source field layout, sentinel values, date
//! pattern and default endpoints used throughout the pipeline.

// =============================================================================
// Source Layout
// =============================================================================

/// Positional field names of a customs-declaration export line
pub const DECLARATION_FIELD_NAMES: &[&str] = &[
    "customs_office",
    "declaration_type",
    "declaration_number",
    "processing_date",
    "sender",
    "recipient_code",
    "recipient",
    "item_number",
    "product_code",
    "product_description",
    "trading_country",
    "shipping_country",
    "origin_country",
    "delivery_terms",
    "delivery_location",
    "quantity",
    "unit",
    "gross_weight",
    "net_weight",
    "customs_weight",
    "invoice_value",
    "special_mark",
    "calculated_invoice_value_usd_kg",
    "unit_weight",
    "weight_difference",
    "contract_type",
    "trade_mark",
    "calculated_customs_value_net_usd_kg",
    "calculated_customs_value_usd_add_unit",
    "calculated_customs_value_gross_usd_kg",
    "min_base_usd_kg",
    "min_base_difference",
    "customs_value_net_usd_kg",
    "customs_value_difference_usd_kg",
    "preferential_rate",
    "full_rate",
];

/// Number of tokens in every well-formed source line
pub const DECLARATION_FIELD_COUNT: usize = 36;

/// Default field delimiter of the source export
pub const DEFAULT_DELIMITER: u8 = b',';

/// Quote character honoured by the decoder
pub const QUOTE_CHAR: u8 = b'"';

// =============================================================================
// Document Identity
// =============================================================================

/// Field forming the first half of the document identity key
pub const IDENTITY_DECLARATION_FIELD: &str = "declaration_number";

/// Field forming the second half of the document identity key
pub const IDENTITY_ITEM_FIELD: &str = "item_number";

/// Separator between the two identity parts
pub const IDENTITY_SEPARATOR: char = '_';

// =============================================================================
// Normalization
// =============================================================================

/// Literal placeholder for missing data in the source export (case-sensitive)
pub const MISSING_VALUE_SENTINEL: &str = "NaN";

/// Source pattern of date fields, in the notation used by the index mapping
pub const SOURCE_DATE_PATTERN: &str = "dd.MM.yy";

/// Two-digit years below this value belong to the 2000s, the rest to the 1900s
pub const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// Output date format for indexed documents
pub const INDEX_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Index Mapping
// =============================================================================

/// Name of the character filter rewriting commas to periods
pub const COMMA_CHAR_FILTER: &str = "comma_to_dot";

/// Name of the analyzer attached to text fields
pub const COMMA_ANALYZER: &str = "comma_decimal";

/// Date formats accepted by the index for date fields
pub const INDEX_DATE_MAPPING_FORMAT: &str = "strict_date_optional_time||dd.MM.yy";

// =============================================================================
// Sink Defaults
// =============================================================================

/// Default OpenSearch endpoint
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index receiving declaration documents
pub const DEFAULT_INDEX_NAME: &str = "customs_declarations";

/// Default number of documents per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Upper bound on documents per bulk request
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Default HTTP timeout for sink requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Default cap on issue messages retained in a run report
pub const DEFAULT_MAX_REPORTED_ISSUES: usize = 100;

// =============================================================================
// Configuration Locations
// =============================================================================

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "customs-ingest";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the OpenSearch URL
pub const ENV_OPENSEARCH_URL: &str = "CUSTOMS_OPENSEARCH_URL";

/// Environment variable overriding the index name
pub const ENV_INDEX_NAME: &str = "CUSTOMS_INDEX";

/// Environment variable providing the OpenSearch username
pub const ENV_OPENSEARCH_USER: &str = "CUSTOMS_OPENSEARCH_USER";

/// Environment variable providing the OpenSearch password
pub const ENV_OPENSEARCH_PASSWORD: &str = "CUSTOMS_OPENSEARCH_PASSWORD";
