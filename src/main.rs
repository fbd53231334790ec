//! FormKeep - form backup tracking
//!
//! Entry point for the `formkeep` command line: inspect, export and purge
//! stored form backups, replay tracker event logs, and serve the dashboard API.

mod cli;

use clap::{Parser, Subcommand};
use cli::helpers::CliContext;
use cli::list::{parse_status, ListView};
use formkeep_core::{error::Result, BackupFilter};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "formkeep")]
#[command(about = "Track, recover and export abandoned form entries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Data directory (overrides FORMKEEP_DATA_DIR env var and default)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored backups, most recent first
    List {
        /// Filter by status (active, abandoned, submitted, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive search over title, form id and field values
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only entries for this form
        #[arg(short, long)]
        form_id: Option<String>,

        /// Abandoned forms updated within the last N hours
        #[arg(long, value_name = "HOURS", conflicts_with_all = ["status", "failed"])]
        abandoned: Option<i64>,

        /// Failed submissions within the last N hours
        #[arg(long, value_name = "HOURS", conflicts_with = "status")]
        failed: Option<i64>,

        /// Maximum number of entries to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show backup statistics
    Stats {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Export backups as JSON or CSV
    Export {
        /// Output format (json, csv); inferred from --output when omitted
        #[arg(short = 'F', long)]
        format: Option<String>,

        /// Only entries for this form
        #[arg(short, long)]
        form_id: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove backups outside the retention window
    Purge {
        /// Remove every stored backup
        #[arg(long)]
        all: bool,
    },

    /// Replay a JSON-lines tracker event log (stdin when no file given)
    Track {
        /// Event log file
        input: Option<PathBuf>,

        /// Delay between commands in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,
    },

    /// Start the dashboard HTTP API
    Serve {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use the requested level for our crates, keep HTTP internals quiet
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!(
        "formkeep={level},formkeep_core={level},tower_http={level},hyper=warn,reqwest=warn"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("FormKeep v{} starting...", env!("CARGO_PKG_VERSION"));

    let ctx = CliContext::load(cli.data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::List {
            status,
            search,
            form_id,
            abandoned,
            failed,
            limit,
            json,
        } => {
            let view = match (abandoned, failed) {
                (Some(hours), _) => ListView::Abandoned { hours },
                (None, Some(hours)) => ListView::Failed { hours },
                (None, None) => ListView::Filtered(BackupFilter {
                    status: parse_status(status)?,
                    search,
                    form_id,
                }),
            };
            cli::list::handle(&ctx, view, limit, json)
        }
        Commands::Stats { json } => cli::stats::handle(&ctx, json),
        Commands::Export {
            format,
            form_id,
            output,
        } => cli::export::handle(&ctx, format, form_id, output),
        Commands::Purge { all } => cli::purge::handle(&ctx, all),
        Commands::Track { input, pace_ms } => cli::track::handle(&ctx, input, pace_ms).await,
        Commands::Serve { addr } => cli::serve::handle(&ctx, addr).await,
    }
}
