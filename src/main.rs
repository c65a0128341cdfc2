use clap::Parser;
use customs_ingest::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(commands::EXIT_SUCCESS);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(commands::EXIT_FAILURE);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // The pipeline checks the token between lines and still flushes
        // buffered documents, so the command future is never dropped here.
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    eprintln!("\nReceived CTRL+C, stopping after the current line...");
                    signal_token.cancel();
                }
                Err(e) => eprintln!("Failed to install CTRL+C signal handler: {}", e),
            }
        });

        commands::run(args, cancellation_token).await
    });

    match result {
        Ok(code) => process::exit(code),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(commands::EXIT_FAILURE);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("customs-ingest - Customs Declaration Loader for OpenSearch");
    println!("==========================================================");
    println!();
    println!("Load headerless customs-declaration CSV exports into an OpenSearch");
    println!("index with typed fields and stable document identities.");
    println!();
    println!("USAGE:");
    println!("    customs-ingest <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    ingest      Ingest a source file into the index (main command)");
    println!("    validate    Decode and normalize a source file without writing");
    println!("    mapping     Print the index mapping for the active schema");
    println!("    check       Check that OpenSearch is reachable");
    println!("    stats       Print the document count of the index");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Ingest an export into the default local cluster:");
    println!("    customs-ingest ingest declarations.csv");
    println!();
    println!("    # Dry run with strict line checking and a JSON report:");
    println!("    customs-ingest validate declarations.csv --strict --output-format json");
    println!();
    println!("    # Ingest into a remote cluster, failing the job on bad lines:");
    println!("    customs-ingest ingest declarations.csv --url https://search:9200 \\");
    println!("                          --index customs_2024 --fail-on-errors");
    println!();
    println!("For detailed help on any command, use:");
    println!("    customs-ingest <COMMAND> --help");
}
