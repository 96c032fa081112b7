//! stow command-line interface
//!
//! Reads and writes JSON documents in a stow database file.
//!
//! # Usage
//!
//! ```bash
//! # Write a document (collections are created on first use)
//! stow --db objects.db put widgets '{"id":"w1","color":"red"}'
//!
//! # Read it back
//! stow --db objects.db get widgets w1
//!
//! # List a collection as JSON
//! stow --db objects.db -o json ls widgets
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use stow_store::{Context, SqliteStore, Storer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod formatter;

use commands::Command;
use config::CliConfig;
use formatter::OutputFormat;

/// stow command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "stow",
    version,
    about = "Store and retrieve JSON documents in self-provisioning collections"
)]
struct Args {
    /// Database path or SQLite URI
    #[arg(short = 'd', long, env = "STOW_DB")]
    db: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum)]
    output: Option<OutputFormatArg>,

    /// Abort the operation after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display documents in a formatted table
    Table,
    /// Display documents as JSON
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let format = match args.output {
        Some(arg) => arg.into(),
        None => OutputFormat::parse(&config.output_format)
            .ok_or_else(|| anyhow!("unknown output format {:?}", config.output_format))?,
    };

    let ctx = match args.timeout_ms {
        Some(ms) => Context::background().with_timeout(Duration::from_millis(ms)),
        None => Context::background(),
    };

    info!("Opening {}", config.database);
    let store = SqliteStore::open_with_config(&config.store_config())?;

    let output = args.command.execute(&store, &ctx, format)?;
    if !output.is_empty() {
        println!("{output}");
    }

    store.close()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stow_cli=debug,stow_store=debug")
    } else {
        EnvFilter::new("stow_cli=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)?
    } else {
        CliConfig::load_default()?
    };

    if let Some(db) = &args.db {
        config.database = db.clone();
    }

    Ok(config)
}
