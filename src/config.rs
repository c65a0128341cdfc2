//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. CLI flags are applied last by the command layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::services::field_normalizer::{CommaScope, NormalizerOptions};
use crate::app::services::ingest_pipeline::{FieldErrorPolicy, IngestPolicy};
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BATCH_SIZE, DEFAULT_DELIMITER,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INDEX_NAME, DEFAULT_MAX_REPORTED_ISSUES,
    DEFAULT_OPENSEARCH_URL, ENV_INDEX_NAME, ENV_OPENSEARCH_PASSWORD, ENV_OPENSEARCH_URL,
    ENV_OPENSEARCH_USER, MAX_BATCH_SIZE, MISSING_VALUE_SENTINEL,
};
use crate::schema::RecordSchema;
use crate::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub opensearch: OpenSearchConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// Where records come from and how lines are split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source file; usually given on the command line
    pub path: Option<PathBuf>,

    /// Single-byte field delimiter
    pub delimiter: char,

    /// TOML file overriding the built-in customs schema
    pub schema_file: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: DEFAULT_DELIMITER as char,
            schema_file: None,
        }
    }
}

/// Target cluster and bulk-write settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchConfig {
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_secs: u64,

    /// Documents per bulk request
    pub batch_size: usize,

    /// Ask the cluster to refresh after each bulk request
    pub refresh: bool,

    /// Create the index with the schema mapping when it is missing
    pub create_index: bool,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OPENSEARCH_URL.to_string(),
            index: DEFAULT_INDEX_NAME.to_string(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            refresh: false,
            create_index: true,
        }
    }
}

/// Error policy and normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub strict_format: bool,
    pub on_field_error: FieldErrorPolicy,
    pub comma_scope: CommaScope,
    pub sentinel: String,
    pub max_reported_issues: usize,
    /// Count repeated identities at the cost of holding every id in memory
    pub track_duplicates: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            strict_format: false,
            on_field_error: FieldErrorPolicy::default(),
            comma_scope: CommaScope::default(),
            sentinel: MISSING_VALUE_SENTINEL.to_string(),
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
            track_duplicates: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub quiet: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            quiet: false,
        }
    }
}

impl Config {
    /// `<config dir>/customs-ingest/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::configuration("Could not determine the user config directory"))
    }

    /// Read a TOML configuration file; missing sections take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file '{}'", path.display()), e)
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::toml(origin, e))
    }

    /// Defaults, then the file if given, then the process environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override connection settings from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = present(ENV_OPENSEARCH_URL) {
            debug!("{} overrides OpenSearch URL", ENV_OPENSEARCH_URL);
            self.opensearch.url = url;
        }
        if let Some(index) = present(ENV_INDEX_NAME) {
            debug!("{} overrides index name", ENV_INDEX_NAME);
            self.opensearch.index = index;
        }
        if let Some(user) = present(ENV_OPENSEARCH_USER) {
            self.opensearch.username = Some(user);
        }
        if let Some(password) = present(ENV_OPENSEARCH_PASSWORD) {
            self.opensearch.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.opensearch.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::configuration(format!(
                "OpenSearch URL must start with http:// or https://, got '{}'",
                self.opensearch.url
            )));
        }

        let index = &self.opensearch.index;
        if index.is_empty()
            || index.starts_with(&['_', '-', '+'][..])
            || index
                .chars()
                .any(|c| c.is_uppercase() || c.is_whitespace() || "/\\*?\"<>|,#:".contains(c))
        {
            return Err(Error::configuration(format!(
                "Invalid index name '{}': use lowercase without spaces or special characters",
                index
            )));
        }

        if !(1..=MAX_BATCH_SIZE).contains(&self.opensearch.batch_size) {
            return Err(Error::configuration(format!(
                "Batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.opensearch.batch_size
            )));
        }

        if self.opensearch.timeout_secs == 0 {
            return Err(Error::configuration("HTTP timeout must be at least 1 second"));
        }

        if self.opensearch.password.is_some() && self.opensearch.username.is_none() {
            return Err(Error::configuration("A password was given without a username"));
        }

        let delimiter = self.source.delimiter;
        if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
            return Err(Error::configuration(format!(
                "Delimiter must be a single ASCII character other than quote or newline, got {:?}",
                delimiter
            )));
        }

        if self.ingest.sentinel.is_empty() {
            return Err(Error::configuration("Missing-value sentinel cannot be empty"));
        }

        Ok(())
    }

    /// Delimiter as the byte the decoder expects
    pub fn delimiter_byte(&self) -> u8 {
        let mut buffer = [0u8; 4];
        self.source.delimiter.encode_utf8(&mut buffer);
        buffer[0]
    }

    /// The configured schema file, or the built-in customs schema
    pub fn load_schema(&self) -> Result<RecordSchema> {
        match &self.source.schema_file {
            Some(path) => {
                debug!("Loading schema from {}", path.display());
                RecordSchema::from_toml_file(path)
            }
            None => Ok(RecordSchema::customs_declarations()),
        }
    }

    pub fn normalizer_options(&self) -> NormalizerOptions {
        NormalizerOptions {
            comma_scope: self.ingest.comma_scope,
            sentinel: self.ingest.sentinel.clone(),
        }
    }

    pub fn policy(&self) -> IngestPolicy {
        IngestPolicy {
            strict_format: self.ingest.strict_format,
            on_field_error: self.ingest.on_field_error,
        }
    }
}
