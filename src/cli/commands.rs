//! Command implementations for the customs ingester CLI
//!
//! This module contains command execution, configuration layering,
//! progress reporting and the final run reports.

use crate::app::services::index_writer::{
    ClusterInfo, CountingSink, IndexSink, OpenSearchClient, OpenSearchSink,
};
use crate::app::services::ingest_pipeline::{IngestPipeline, IngestReport};
use crate::cli::args::{
    Args, Commands, CommonOptions, ConnectionArgs, ConnectionOptions, IngestArgs, MappingArgs,
    OutputFormat, ProcessingOptions, ValidateArgs,
};
use crate::config::Config;
use crate::schema::{RecordSchema, index_mapping};
use crate::{Error, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Process exit status for a clean run
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit status when the command failed
pub const EXIT_FAILURE: i32 = 1;

/// Process exit status when lines failed and `--fail-on-errors` was given
pub const EXIT_LINE_FAILURES: i32 = 2;

/// Main command runner
///
/// Sets up logging, layers configuration, dispatches the subcommand and
/// returns the process exit status.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<i32> {
    let Some(command) = args.command else {
        return Err(Error::configuration("No command given"));
    };

    setup_logging(command.common())?;
    debug!("Command line arguments: {:?}", command);

    let result = match &command {
        Commands::Ingest(ingest) => run_ingest(ingest, cancel).await,
        Commands::Validate(validate) => run_validate(validate, cancel).await,
        Commands::Mapping(mapping) => run_mapping(mapping),
        Commands::Check(check) => run_check(check).await,
        Commands::Stats(stats) => run_stats(stats).await,
    };

    if let Err(error) = &result {
        if is_critical_error(error) {
            error!("Command aborted: {}", error);
        } else {
            warn!("Command failed: {}", error);
        }
    }
    result
}

/// Set up structured logging based on CLI arguments
fn setup_logging(common: &CommonOptions) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = common.get_log_level();

    // Create filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("customs_ingest={}", log_level)));

    let initialized = if common.quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        // Standard logging with timestamps
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    initialized
        .map_err(|e| Error::configuration(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
fn load_configuration(common: &CommonOptions) -> Result<Config> {
    info!("Loading configuration");

    let default_config_path = if common.config_file.is_none() {
        Config::default_config_path().ok()
    } else {
        None
    };

    let config_file = match &common.config_file {
        Some(path) => Some(path.as_path()),
        None => default_config_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| path.as_path()),
    };

    if let Some(config_path) = config_file {
        info!("Using config file: {}", config_path.display());
    } else {
        info!("No config file found, using defaults and environment variables");
    }

    let mut config = Config::load_layered(config_file)?;
    config.logging.level = common.get_log_level().to_string();
    config.logging.quiet = common.quiet;
    Ok(config)
}

fn apply_connection_overrides(config: &mut Config, connection: &ConnectionOptions) {
    if let Some(url) = &connection.url {
        config.opensearch.url = url.clone();
    }
    if let Some(index) = &connection.index {
        config.opensearch.index = index.clone();
    }
    if let Some(username) = &connection.username {
        config.opensearch.username = Some(username.clone());
    }
}

fn apply_processing_overrides(config: &mut Config, processing: &ProcessingOptions) {
    if processing.strict {
        config.ingest.strict_format = true;
    }
    if let Some(policy) = processing.on_field_error {
        config.ingest.on_field_error = policy;
    }
    if let Some(scope) = processing.comma_scope {
        config.ingest.comma_scope = scope;
    }
    if let Some(delimiter) = processing.delimiter {
        config.source.delimiter = delimiter;
    }
    if let Some(schema_file) = &processing.schema_file {
        config.source.schema_file = Some(schema_file.clone());
    }
    if processing.track_duplicates {
        config.ingest.track_duplicates = true;
    }
}

/// Apply every ingest flag on top of the layered configuration
fn apply_ingest_overrides(config: &mut Config, args: &IngestArgs) {
    apply_connection_overrides(config, &args.connection);
    apply_processing_overrides(config, &args.processing);
    if let Some(batch_size) = args.batch_size {
        config.opensearch.batch_size = batch_size;
    }
    if args.no_create_index {
        config.opensearch.create_index = false;
    }
    if args.refresh {
        config.opensearch.refresh = true;
    }
    config.source.path = Some(args.file.clone());
}

fn build_pipeline(
    config: &Config,
    schema: Arc<RecordSchema>,
    show_progress: bool,
) -> Result<IngestPipeline> {
    let mut pipeline = IngestPipeline::new(schema, config.policy())
        .with_normalizer_options(config.normalizer_options())
        .with_delimiter(config.delimiter_byte())
        .with_batch_size(config.opensearch.batch_size)
        .with_max_reported_issues(config.ingest.max_reported_issues)
        .with_duplicate_tracking(config.ingest.track_duplicates);

    if show_progress && std::io::stderr().is_terminal() {
        pipeline = pipeline.with_progress(create_spinner("Reading lines")?);
    }
    Ok(pipeline)
}

/// Line counter spinner for a source of unknown length
fn create_spinner(message: &str) -> Result<ProgressBar> {
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} lines {msg}")
        .map_err(|e| Error::configuration(format!("Invalid progress template: {}", e)))?
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn open_source(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| Error::io(format!("Failed to open source file '{}'", path.display()), e))
}

async fn run_ingest(args: &IngestArgs, cancel: CancellationToken) -> Result<i32> {
    args.validate()?;

    let mut config = load_configuration(&args.common)?;
    apply_ingest_overrides(&mut config, args);
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let schema = Arc::new(config.load_schema()?);
    let client = OpenSearchClient::new(&config.opensearch)?;
    let mut sink = OpenSearchSink::new(client, config.opensearch.create_index);

    info!(
        "Ingesting {} into {} at {}",
        args.file.display(),
        config.opensearch.index,
        config.opensearch.url
    );
    sink.ensure_index(&index_mapping(&schema)).await?;

    let pipeline = build_pipeline(&config, schema, args.common.show_progress())?;
    let report = pipeline
        .run(open_source(&args.file)?, &mut sink, &cancel)
        .await?;

    generate_final_report(args.common.output_format, &report, Some(&config.opensearch.index))?;
    finish(&report, args.fail_on_errors)
}

async fn run_validate(args: &ValidateArgs, cancel: CancellationToken) -> Result<i32> {
    args.validate()?;

    let mut config = load_configuration(&args.common)?;
    apply_processing_overrides(&mut config, &args.processing);
    config.source.path = Some(args.file.clone());
    config.validate()?;

    info!("Validating {} without writing to the index", args.file.display());

    let schema = Arc::new(config.load_schema()?);
    let mut sink = CountingSink::new();
    sink.ensure_index(&index_mapping(&schema)).await?;

    let pipeline = build_pipeline(&config, schema, args.common.show_progress())?;
    let report = pipeline
        .run(open_source(&args.file)?, &mut sink, &cancel)
        .await?;

    info!(
        "{} documents in {} batches would be sent ({} bytes of document bodies)",
        sink.write_count(),
        sink.batch_count(),
        sink.body_bytes()
    );
    generate_final_report(args.common.output_format, &report, None)?;
    finish(&report, args.fail_on_errors)
}

fn run_mapping(args: &MappingArgs) -> Result<i32> {
    let mut config = load_configuration(&args.common)?;
    if let Some(schema_file) = &args.schema_file {
        config.source.schema_file = Some(schema_file.clone());
    }

    let mapping = index_mapping(&config.load_schema()?);
    let rendered = serde_json::to_string_pretty(&mapping)
        .map_err(|e| Error::json("Failed to render index mapping", e))?;
    println!("{}", rendered);
    Ok(EXIT_SUCCESS)
}

async fn run_check(args: &ConnectionArgs) -> Result<i32> {
    let config = connection_config(args)?;
    let client = OpenSearchClient::new(&config.opensearch)?;

    let info = client.ping().await?;
    let index_exists = client.index_exists().await?;
    generate_check_report(args.common.output_format, &config, &info, index_exists)?;
    Ok(EXIT_SUCCESS)
}

async fn run_stats(args: &ConnectionArgs) -> Result<i32> {
    let config = connection_config(args)?;
    let client = OpenSearchClient::new(&config.opensearch)?;

    let count = client.document_count().await?;
    match args.common.output_format {
        OutputFormat::Human => println!(
            "{} {}",
            format!("Documents in '{}':", client.index()).bright_cyan(),
            count.to_string().bright_white().bold()
        ),
        OutputFormat::Json => print_json(&serde_json::json!({
            "index": client.index(),
            "count": count,
        }))?,
    }
    Ok(EXIT_SUCCESS)
}

fn connection_config(args: &ConnectionArgs) -> Result<Config> {
    let mut config = load_configuration(&args.common)?;
    apply_connection_overrides(&mut config, &args.connection);
    config.validate()?;
    Ok(config)
}

/// Exit status for a completed run
fn finish(report: &IngestReport, fail_on_errors: bool) -> Result<i32> {
    if report.cancelled {
        return Err(Error::processing_interrupted(format!(
            "stopped by user after {} lines",
            report.lines_read
        )));
    }
    Ok(exit_code(report, fail_on_errors))
}

fn exit_code(report: &IngestReport, fail_on_errors: bool) -> i32 {
    if fail_on_errors && report.failed_lines() > 0 {
        EXIT_LINE_FAILURES
    } else {
        EXIT_SUCCESS
    }
}

/// Check if an error is critical enough to stop processing
pub fn is_critical_error(error: &Error) -> bool {
    error.is_critical()
}

/// Generate final ingestion report
fn generate_final_report(
    format: OutputFormat,
    report: &IngestReport,
    index: Option<&str>,
) -> Result<()> {
    info!("Generating final report");

    match format {
        OutputFormat::Human => generate_human_report(report, index),
        OutputFormat::Json => generate_json_report(report, index),
    }
}

/// Generate human-readable report
fn generate_human_report(report: &IngestReport, index: Option<&str>) -> Result<()> {
    let title = match index {
        Some(_) => "Ingestion Summary",
        None => "Validation Summary",
    };

    println!("\n{}", title.bright_green().bold());
    if let Some(index) = index {
        println!("  {} {}", "Index:".bright_cyan(), index.bright_white());
    }
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(report.elapsed).to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Lines read:".bright_cyan(),
        report.lines_read.to_string().bright_white()
    );
    println!(
        "  {} {} ({:.1}%)",
        "Records written:".bright_cyan(),
        report.records_written.to_string().bright_white().bold(),
        report.success_rate()
    );
    println!(
        "  {} {}",
        "Batches sent:".bright_cyan(),
        report.batches_sent.to_string().bright_white()
    );

    let failures = [
        ("Malformed lines:", report.format_errors),
        ("Records skipped on field errors:", report.parse_failures),
        ("Records without identity:", report.identity_failures),
        ("Sink rejections:", report.sink_rejections),
    ];
    for (label, count) in failures.iter().filter(|(_, count)| *count > 0) {
        println!("  {} {}", label.bright_red(), count.to_string().bright_red().bold());
    }

    if report.fields_nulled > 0 {
        println!(
            "  {} {}",
            "Fields nulled on error:".bright_yellow(),
            report.fields_nulled.to_string().bright_yellow()
        );
    }
    if report.sentinel_nulls > 0 {
        println!(
            "  {} {}",
            "Sentinel values dropped:".bright_cyan(),
            report.sentinel_nulls.to_string().bright_white()
        );
    }
    if report.duplicate_ids > 0 {
        println!(
            "  {} {}",
            "Repeated identities (overwritten):".bright_yellow(),
            report.duplicate_ids.to_string().bright_yellow()
        );
    }

    if !report.issues.is_empty() {
        println!("\n{}", "Issues".bright_yellow().bold());
        for issue in &report.issues {
            println!("  • {}", issue);
        }
        if report.issues_truncated > 0 {
            println!("  … and {} more", report.issues_truncated);
        }
    }

    if report.cancelled {
        println!("\n{}", "Run cancelled before the end of the source".bright_red());
    }

    println!();
    Ok(())
}

/// Generate JSON report for machine consumption
fn generate_json_report(report: &IngestReport, index: Option<&str>) -> Result<()> {
    let json_report = serde_json::json!({
        "index": index,
        "dry_run": index.is_none(),
        "processing_time_seconds": report.elapsed.as_secs_f64(),
        "success_rate": report.success_rate(),
        "failed_lines": report.failed_lines(),
        "report": report,
    });
    print_json(&json_report)
}

fn generate_check_report(
    format: OutputFormat,
    config: &Config,
    info: &ClusterInfo,
    index_exists: bool,
) -> Result<()> {
    match format {
        OutputFormat::Human => {
            println!(
                "{} {}",
                "OpenSearch reachable at".bright_green().bold(),
                config.opensearch.url.bright_white()
            );
            println!("  {} {}", "Cluster:".bright_cyan(), info.cluster_name);
            println!("  {} {}", "Node:".bright_cyan(), info.name);
            println!(
                "  {} {} {}",
                "Version:".bright_cyan(),
                info.version.distribution.as_deref().unwrap_or("elasticsearch"),
                info.version.number
            );
            let index_state = if index_exists {
                "present".bright_green()
            } else {
                "missing".bright_yellow()
            };
            println!(
                "  {} {} ({})",
                "Index:".bright_cyan(),
                config.opensearch.index,
                index_state
            );
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "url": config.opensearch.url,
            "cluster": info,
            "index": config.opensearch.index,
            "index_exists": index_exists,
        })),
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| Error::json("Failed to render report", e))?;
    println!("{}", rendered);
    Ok(())
}
