//! Config command implementation.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;
use fantasai_orchestrator::OrchestratorConfig;
use std::path::PathBuf;

use crate::config::{LoadedConfig, default_local_path};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write the default configuration file
    Init {
        /// Target file (defaults to ./fantasai.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub fn execute(command: ConfigCommand, loaded: &LoadedConfig) -> Result<()> {
    match command {
        ConfigCommand::Show => show(loaded),
        ConfigCommand::Init { path, force } => init(path.unwrap_or_else(default_local_path), force),
    }
}

fn show(loaded: &LoadedConfig) -> Result<()> {
    match &loaded.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    print!("{}", loaded.config.to_toml_string()?);
    Ok(())
}

fn init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    OrchestratorConfig::default()
        .save_to_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} Wrote default configuration to {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}
