//! Generate command implementation.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use fantasai_models::ImageFormat;
use fantasai_orchestrator::{OrchestratorConfig, error_response, validate_prompt};
use std::path::{Path, PathBuf};

/// Execute the generate command.
pub async fn execute(
    config: &OrchestratorConfig,
    prompt: &str,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    // Reject bad prompts before any provider client is built.
    if let Err(err) = validate_prompt(prompt) {
        if json {
            let (status, envelope) = error_response(&err);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            bail!("Request rejected with status {}", status);
        }
        return Err(err.into());
    }

    let orchestrator = config.build_orchestrator().context("Failed to initialize models")?;

    if json {
        let (status, envelope) = orchestrator.generate_response(prompt).await;
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if !envelope.success {
            bail!("Image generation failed with status {}", status);
        }
        return Ok(());
    }

    let image = match orchestrator.generate(prompt).await {
        Ok(image) => image,
        Err(err) => {
            let (status, envelope) = error_response(&err);
            for failure in err.failures() {
                eprintln!("  {} {}: {}", "✗".red(), failure.model_id, failure.error);
            }
            bail!(
                "{} (status {})",
                envelope.error.unwrap_or_else(|| err.to_string()),
                status
            );
        }
    };

    let format = ImageFormat::detect(&image.bytes);
    let path = output.unwrap_or_else(|| default_output_path(format));
    std::fs::write(&path, &image.bytes)
        .with_context(|| format!("Failed to write image to {}", path.display()))?;

    let source = image.model_id.as_deref().unwrap_or("cache");
    println!(
        "{} Saved {} ({} bytes, {})",
        "✓".green(),
        path.display().to_string().cyan(),
        image.bytes.len(),
        source.dimmed()
    );

    Ok(())
}

/// `fantasai-<unix-seconds>.<ext>` in the current directory.
fn default_output_path(format: Option<ImageFormat>) -> PathBuf {
    let extension = format.map_or("png", ImageFormat::extension);
    Path::new(".").join(format!("fantasai-{}.{}", chrono::Utc::now().timestamp(), extension))
}
