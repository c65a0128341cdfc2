//! Command-line argument definitions for the customs ingester
//!
//! This module defines the CLI interface using the clap derive API. Flags
//! left unset fall through to the configuration file and environment.

use crate::app::services::field_normalizer::CommaScope;
use crate::app::services::ingest_pipeline::FieldErrorPolicy;
use crate::constants::MAX_BATCH_SIZE;
use crate::{Error, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// CLI arguments for the customs-declaration ingester
///
/// Loads headerless customs-declaration CSV exports into an OpenSearch
/// index with a fixed, typed document schema.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "customs-ingest",
    version,
    about = "Load customs-declaration CSV exports into OpenSearch",
    long_about = "Streams headerless customs-declaration CSV exports into an OpenSearch index. \
                  Normalizes comma decimals, turns NaN sentinels into absent fields, parses \
                  dd.MM.yy dates and keys every document by declaration and item number so \
                  re-running an import overwrites instead of duplicating."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Ingest a source file into the OpenSearch index
    Ingest(IngestArgs),
    /// Decode and normalize a source file without writing anywhere
    Validate(ValidateArgs),
    /// Print the index creation body for the active schema
    Mapping(MappingArgs),
    /// Check that the OpenSearch cluster is reachable
    Check(ConnectionArgs),
    /// Print the document count of the target index
    Stats(ConnectionArgs),
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct CommonOptions {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Cluster connection overrides
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct ConnectionOptions {
    #[arg(
        long = "url",
        value_name = "URL",
        help = "OpenSearch base URL [default: http://localhost:9200]"
    )]
    pub url: Option<String>,

    #[arg(
        long = "index",
        value_name = "NAME",
        help = "Target index name [default: customs_declarations]"
    )]
    pub index: Option<String>,

    #[arg(long = "user", value_name = "NAME", help = "Basic-auth user name")]
    pub username: Option<String>,
}

/// Decoding and normalization overrides
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct ProcessingOptions {
    #[arg(
        long = "strict",
        help = "Abort on the first line with the wrong number of fields"
    )]
    pub strict: bool,

    #[arg(
        long = "on-field-error",
        value_enum,
        value_name = "POLICY",
        help = "What to do with a record whose fields fail coercion [default: null-field]"
    )]
    pub on_field_error: Option<FieldErrorPolicy>,

    #[arg(
        long = "comma-scope",
        value_enum,
        value_name = "SCOPE",
        help = "Fields receiving the comma-to-period rewrite [default: all-fields]"
    )]
    pub comma_scope: Option<CommaScope>,

    #[arg(
        short = 'd',
        long = "delimiter",
        value_name = "CHAR",
        help = "Field delimiter [default: ,]"
    )]
    pub delimiter: Option<char>,

    #[arg(
        long = "schema",
        value_name = "FILE",
        help = "TOML schema file replacing the built-in customs layout"
    )]
    pub schema_file: Option<PathBuf>,

    #[arg(
        long = "track-duplicates",
        help = "Count repeated identities (keeps every document id in memory)"
    )]
    pub track_duplicates: bool,
}

/// Arguments for the ingest command
#[derive(Debug, Clone, Parser)]
pub struct IngestArgs {
    /// Source CSV export
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionOptions,

    #[command(flatten)]
    pub processing: ProcessingOptions,

    #[arg(
        short = 'b',
        long = "batch-size",
        value_name = "COUNT",
        help = "Documents per bulk request [default: 500]"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "no-create-index",
        help = "Fail instead of creating the index when it does not exist"
    )]
    pub no_create_index: bool,

    #[arg(
        long = "refresh",
        help = "Refresh the index after every bulk request"
    )]
    pub refresh: bool,

    #[arg(
        long = "fail-on-errors",
        help = "Exit with status 2 when any line was not written"
    )]
    pub fail_on_errors: bool,

    #[command(flatten)]
    pub common: CommonOptions,
}

/// Arguments for the validate command
#[derive(Debug, Clone, Parser)]
pub struct ValidateArgs {
    /// Source CSV export
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub processing: ProcessingOptions,

    #[arg(
        long = "fail-on-errors",
        help = "Exit with status 2 when any line would not be written"
    )]
    pub fail_on_errors: bool,

    #[command(flatten)]
    pub common: CommonOptions,
}

/// Arguments for the mapping command
#[derive(Debug, Clone, Parser)]
pub struct MappingArgs {
    #[arg(
        long = "schema",
        value_name = "FILE",
        help = "TOML schema file replacing the built-in customs layout"
    )]
    pub schema_file: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonOptions,
}

/// Arguments for commands that only talk to the cluster
#[derive(Debug, Clone, Parser)]
pub struct ConnectionArgs {
    #[command(flatten)]
    pub connection: ConnectionOptions,

    #[command(flatten)]
    pub common: CommonOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl Commands {
    pub fn common(&self) -> &CommonOptions {
        match self {
            Commands::Ingest(args) => &args.common,
            Commands::Validate(args) => &args.common,
            Commands::Mapping(args) => &args.common,
            Commands::Check(args) | Commands::Stats(args) => &args.common,
        }
    }
}

impl CommonOptions {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress spinners (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err(Error::configuration(format!(
                    "Delimiter must be a single ASCII character, got {:?}",
                    delimiter
                )));
            }
        }
        if let Some(schema_file) = &self.schema_file {
            require_file(schema_file, "Schema file")?;
        }
        Ok(())
    }
}

impl IngestArgs {
    /// Validate the ingest command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file, "Source file")?;
        self.processing.validate()?;

        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
                return Err(Error::configuration(format!(
                    "Batch size must be between 1 and {}, got {}",
                    MAX_BATCH_SIZE, batch_size
                )));
            }
        }
        Ok(())
    }
}

impl ValidateArgs {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file, "Source file")?;
        self.processing.validate()
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        return Err(Error::configuration(format!(
            "{} does not exist: {}",
            what,
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(Error::configuration(format!(
            "{} is not a regular file: {}",
            what,
            path.display()
        )));
    }
    Ok(())
}
