//! Merge command - resolve per-source extractions into one record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use serde_json::Value;
use tracing::{debug, info};

use kvrecon_core::ExtractionRecord;

use super::load_config;

/// Arguments for the merge command.
#[derive(Args)]
pub struct MergeArgs {
    /// Records file or glob pattern; each file holds one record or an array
    #[arg(required = true)]
    input: String,

    /// Comma-separated keys to merge (default: every key seen)
    #[arg(short, long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print only the merged key-value map
    #[arg(long)]
    values_only: bool,
}

pub async fn run(args: MergeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?.filter_map(|r| r.ok()).collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let mut records = Vec::new();
    for path in &files {
        let loaded = read_records(path)?;
        debug!("Loaded {} records from {}", loaded.len(), path.display());
        records.extend(loaded);
    }

    info!("Merging {} records", records.len());

    let merger = config.merger();
    let merged = if args.keys.is_empty() {
        merger.merge_all_keys(&records)
    } else {
        merger.merge(&records, &args.keys)
    };

    let output = if args.values_only {
        serde_json::to_string_pretty(&merged.extracted_data())?
    } else {
        serde_json::to_string_pretty(&merged)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Merged {} keys from {} records into {}",
            style("✓").green(),
            merged.fields.len(),
            records.len(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Read one record or an array of records from a JSON file.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<ExtractionRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ExtractionRecord>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };

    Ok(records)
}
