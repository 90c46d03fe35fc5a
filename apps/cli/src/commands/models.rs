//! Models command implementation.

use anyhow::Result;
use colored::Colorize;
use fantasai_models::ModelFactory;
use fantasai_orchestrator::{ModelSection, OrchestratorConfig};
use serde_json::json;
use tracing::warn;

/// Whether a provider client can be built for `model`, or why not.
fn client_readiness(config: &OrchestratorConfig, model: &ModelSection) -> Result<(), String> {
    let model_config = config.model_config(model).map_err(|e| e.to_string())?;
    ModelFactory::create(model_config).map(|_| ()).map_err(|e| e.to_string())
}

/// Execute the models command.
pub fn execute(config: &OrchestratorConfig, json_output: bool) -> Result<()> {
    let mut models: Vec<_> = config.models.iter().collect();
    models.sort_by_key(|model| model.priority);

    let readiness: Vec<Result<(), String>> = models
        .iter()
        .map(|model| {
            let ready = client_readiness(config, model);
            if let Err(reason) = &ready {
                warn!(model_id = %model.id, reason = %reason, "Model client not ready");
            }
            ready
        })
        .collect();

    if json_output {
        let model_list: Vec<_> = models
            .iter()
            .zip(&readiness)
            .map(|(model, ready)| {
                json!({
                    "id": model.id,
                    "priority": model.priority,
                    "model_type": model.model_type,
                    "timeout_ms": model.timeout_ms,
                    "parameters": model.parameters,
                    "ready": ready.is_ok(),
                    "not_ready_reason": ready.as_ref().err(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&model_list)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Configured Models ({})", models.len()).bold().cyan());
    println!();
    println!("{:<4} {:<45} {:<12} {:>9}  {}", "#", "ID", "Type", "Timeout", "Client");
    println!("{}", "─".repeat(84));

    for (model, ready) in models.iter().zip(&readiness) {
        let client_str = if ready.is_ok() { "✓ ready".green() } else { "✗ not ready".red() };

        println!(
            "{:<4} {:<45} {:<12} {:>8}s  {}",
            model.priority,
            model.id.cyan(),
            model.model_type.dimmed(),
            format!("{:.1}", model.timeout_ms as f64 / 1000.0),
            client_str
        );
    }

    println!();
    Ok(())
}
