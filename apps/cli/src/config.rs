//! CLI configuration discovery.

use anyhow::{Context, Result};
use fantasai_orchestrator::OrchestratorConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "FANTASAI_CONFIG";

/// Configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: OrchestratorConfig,
    /// `None` when running on built-in defaults.
    pub source: Option<PathBuf>,
}

/// Get default local configuration file path.
pub fn default_local_path() -> PathBuf {
    PathBuf::from("fantasai.toml")
}

/// Get default global configuration file path.
pub fn default_global_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fantasai").join("config.toml"))
}

/// Picks the configuration file to load.
///
/// Precedence:
/// 1. `--config`
/// 2. `FANTASAI_CONFIG`
/// 3. `./fantasai.toml`
/// 4. `~/.fantasai/config.toml`
///
/// Paths named explicitly (1, 2) are returned even if missing so loading can
/// report them; discovered paths (3, 4) only when they exist.
fn resolve_path(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    local: &Path,
    global: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    if local.exists() {
        return Some(local.to_path_buf());
    }
    global.filter(|p| p.exists())
}

/// Load the effective configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let path = resolve_path(explicit, from_env, &default_local_path(), default_global_path());

    let Some(path) = path else {
        debug!("No configuration file found, using built-in defaults");
        return Ok(LoadedConfig { config: OrchestratorConfig::default(), source: None });
    };

    let config = OrchestratorConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    Ok(LoadedConfig { config, source: Some(path) })
}
