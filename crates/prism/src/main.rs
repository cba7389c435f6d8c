//! Prism CLI - product photo analysis service.
//!
//! Prism serves an HTTP API that extracts dominant product colors from
//! photos and generates product titles and descriptions from an image
//! caption. The same pipeline is available from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Start the HTTP API
//! prism serve --port 8000
//!
//! # Caption a single image
//! prism caption wallet.jpg
//!
//! # Dominant colors, one JSON line per image
//! prism colors front.jpg back.jpg
//!
//! # View configuration
//! prism config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Prism - dominant colors, titles, and descriptions for product photos.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PRISM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve(cli::serve::ServeArgs),

    /// Caption a single image
    Caption(cli::inspect::CaptionArgs),

    /// Extract the dominant colors of images
    Colors(cli::inspect::ColorsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // API_KEY and friends may live in a local .env file.
    let dotenv = dotenvy::dotenv();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => prism_core::Config::load_from(path)?,
        None => match prism_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `prism config path`."
                );
                prism_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);
    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Caption(args) => cli::inspect::caption(args, config).await,
        Commands::Colors(args) => cli::inspect::colors(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
