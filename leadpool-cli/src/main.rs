//! Leadpool CLI: run the server and maintenance tasks.
//!
//! ```bash
//! leadpool serve --port 9090
//! leadpool import leads.json --as gen-1
//! leadpool recompute --start 2024-06-01T00:00:00Z --end 2024-06-30T23:59:59Z
//! ```
//!
//! Every command reads `leadpool.toml` (or `--config`) and `LP_*`
//! environment variables; flags win over both.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadpool_core::config::{LeadpoolConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "leadpool", about = "Lead distribution and dashboard aggregation", version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Journal file; overrides [storage] journal_path
        #[arg(long)]
        journal: Option<PathBuf>,
    },
    /// Rebuild the inventory snapshot and performance records
    Recompute {
        /// RFC 3339 lower bound of the inventory window
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// RFC 3339 upper bound of the inventory window
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Create leads from a JSON array of lead requests
    Import {
        file: PathBuf,

        /// Id recorded as the creator of every imported lead
        #[arg(long = "as", default_value = "import")]
        creator: String,
    },
    /// Validate the resolved configuration and print it
    CheckConfig,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = LeadpoolConfig::load_from(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if let Commands::CheckConfig = cli.command {
        return commands::check_config::run(&config);
    }

    leadpool_core::logging::init_logging(&config.logging.logger_config()?)?;

    match cli.command {
        Commands::Serve { host, port, journal } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if journal.is_some() {
                config.storage.journal_path = journal;
            }
            config.validate()?;
            runtime(&config)?.block_on(commands::serve::run(config))
        }
        Commands::Recompute { start, end } => {
            config.validate()?;
            let window = commands::recompute::parse_window(start.as_deref(), end.as_deref())?;
            runtime(&config)?.block_on(commands::recompute::run(&config, window))
        }
        Commands::Import { file, creator } => {
            config.validate()?;
            runtime(&config)?.block_on(commands::import::run(&config, &file, &creator))
        }
        Commands::CheckConfig => Ok(()),
    }
}

fn runtime(config: &LeadpoolConfig) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.server.workers {
        builder.worker_threads(workers);
    }
    builder.enable_all().build().context("Failed to start the tokio runtime")
}
