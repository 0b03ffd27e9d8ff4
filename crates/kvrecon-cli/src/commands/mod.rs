//! Subcommand implementations.

pub mod batch;
pub mod compare;
pub mod config;
pub mod detect;
pub mod merge;
pub mod normalize;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use kvrecon_core::{FormatRegistry, ReconConfig};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kvrecon")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReconConfig> {
    let config = match config_path {
        Some(path) => ReconConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading config from {}", path.display());
                ReconConfig::from_file(&path)?
            } else {
                ReconConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Read a persisted registry, or start an empty one if the file does not exist.
pub fn load_registry(path: Option<&Path>) -> anyhow::Result<FormatRegistry> {
    match path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path)?;
            let registry: FormatRegistry = serde_json::from_str(&content)
                .with_context(|| format!("Invalid format registry {}", path.display()))?;
            debug!("Loaded {} known formats from {}", registry.len(), path.display());
            Ok(registry)
        }
        _ => Ok(FormatRegistry::new()),
    }
}

/// Persist a registry as a JSON array.
pub fn save_registry(path: &Path, registry: &FormatRegistry) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(registry)?)?;
    Ok(())
}

/// Date strings from arguments plus non-empty lines of an optional file.
pub fn collect_inputs(values: &[String], file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut inputs = values.to_vec();

    if let Some(file) = file {
        let content = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        inputs.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }

    if inputs.is_empty() {
        anyhow::bail!("No input dates given");
    }
    Ok(inputs)
}
