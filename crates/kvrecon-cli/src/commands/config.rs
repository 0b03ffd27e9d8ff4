//! Config command - inspect and edit the JSON configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use kvrecon_core::ReconConfig;

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Write here instead of the configured path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value by dotted key (e.g. "matching.fuzzy_threshold")
    Get { key: String },

    /// Change one value by dotted key; the result must validate
    Set {
        key: String,
        /// JSON value; anything that is not JSON is taken as a string
        value: String,
    },

    /// Print the configuration file location
    Path,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => {
            if !path.exists() {
                eprintln!("{} {} does not exist, showing defaults", style("ℹ").blue(), path.display());
            }
            println!("{}", serde_json::to_string_pretty(&load_or_default(&path)?)?);
        }
        ConfigCommand::Init { output, force } => {
            let target = output.unwrap_or(path);
            if target.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    target.display()
                );
            }
            write_config(&target, &ReconConfig::default())?;
            println!("{} Wrote default configuration to {}", style("✓").green(), target.display());
        }
        ConfigCommand::Get { key } => {
            let value = load_or_default(&path)?.get_key(&key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        ConfigCommand::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            let updated = load_or_default(&path)?.with_key(&key, value.clone())?;
            write_config(&path, &updated)?;
            println!("{} {} = {}", style("✓").green(), key, value);
        }
        ConfigCommand::Path => {
            let status = if path.exists() {
                style("exists").green()
            } else {
                style("not created (run 'kvrecon config init')").yellow()
            };
            println!("{} [{}]", path.display(), status);
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> anyhow::Result<ReconConfig> {
    if !path.exists() {
        return Ok(ReconConfig::default());
    }
    ReconConfig::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn write_config(path: &Path, config: &ReconConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    config
        .save(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}
