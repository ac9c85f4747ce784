mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragstore::config::{self, RagConfig};
use ragstore::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragstore", version, about = "Embed a passage corpus and serve vector search over HTTP")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP retrieval API
    Serve,
    /// Load the corpus, embed it, and reload the collection
    Ingest {
        /// Ignore the processed snapshot and re-embed every passage
        #[arg(long)]
        force: bool,
    },
    /// Show collection statistics
    Info,
    /// Delete every document from the collection
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Drop and recreate the collection
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check database, snapshot, and provider health
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::load_from(path)?,
        None => RagConfig::load_from(config::default_config_path())?,
    };

    // Log to stderr so command output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            // Built before the runtime: the provider owns a blocking HTTP client.
            let state = server::build_state(&config)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(server::serve(&config.bind_addr(), state))?;
        }
        Command::Ingest { force } => cli::ingest::ingest(&config, force)?,
        Command::Info => cli::info::info(&config)?,
        Command::Clear { yes } => cli::clear::clear(&config, yes)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
