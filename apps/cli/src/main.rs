//! Fantasai CLI - Command-line interface for the Fantasai image generator
//!
//! This CLI provides a `fantasai` command that turns text prompts into images
//! through a prioritized list of hosted models with automatic fallback.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{ConfigCommand, config as config_cmd, generate, models};

/// Fantasai CLI - AI image generation with provider fallback
#[derive(Parser, Debug)]
#[command(
    name = "fantasai",
    author,
    version,
    about = "Fantasai - AI image generation with provider fallback",
    long_about = "Fantasai turns text prompts into images.\nModels are tried in priority order; unhealthy ones are skipped and repeated prompts are served from cache."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (overrides FANTASAI_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an image from a text prompt
    ///
    /// Writes the image to disk, or prints the JSON response envelope with --json.
    Generate {
        /// Text prompt (at most 500 characters)
        prompt: String,

        /// Output file (defaults to fantasai-<timestamp>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the JSON response envelope instead of writing a file
        #[arg(long)]
        json: bool,
    },

    /// List configured models in priority order
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let loaded = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Generate { prompt, output, json } => {
            generate::execute(&loaded.config, &prompt, output, json).await?;
        }
        Command::Models { json } => {
            models::execute(&loaded.config, json)?;
        }
        Command::Config(cmd) => {
            config_cmd::execute(cmd, &loaded)?;
        }
    }

    Ok(())
}
