//! Compare command - score extracted values against expected values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use serde_json::Value;

use kvrecon_core::matching::{ComparisonResult, MatchStatus};
use kvrecon_core::models::record::field_map_from_json;
use kvrecon_core::FieldMap;

use super::load_config;

/// Arguments for the compare command.
#[derive(Args)]
pub struct CompareArgs {
    /// Extracted key-value JSON object (or a record with `extracted_data`)
    extracted: PathBuf,

    /// Expected key-value JSON object
    expected: PathBuf,

    /// Comma-separated keys to treat as dates (default: classify by name)
    #[arg(long, value_delimiter = ',')]
    date_fields: Vec<String>,

    /// Fuzzy similarity threshold (0.0 - 1.0)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: CompareArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(threshold) = args.threshold {
        config.matching.fuzzy_threshold = threshold;
    }
    if !args.date_fields.is_empty() {
        config.matching.date_fields = Some(args.date_fields.clone());
    }
    config.validate()?;

    let extracted = read_field_map(&args.extracted)?;
    let expected = read_field_map(&args.expected)?;

    let result = config.comparison_engine().compare(&extracted, &expected);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

/// Read a flat key-value object. A record wrapper with `extracted_data` or
/// `expected_kvp` is unwrapped.
pub fn read_field_map(path: &Path) -> anyhow::Result<FieldMap> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    for wrapper in ["extracted_data", "expected_kvp"] {
        if let Some(inner) = value.get_mut(wrapper).map(Value::take) {
            value = inner;
            break;
        }
    }

    let map: BTreeMap<String, Value> = serde_json::from_value(value)
        .with_context(|| format!("{} is not a key-value object", path.display()))?;
    Ok(field_map_from_json(map))
}

pub fn print_result(result: &ComparisonResult) {
    for (key, detail) in &result.details {
        let marker = match detail.status {
            MatchStatus::Match => style("✓").green(),
            MatchStatus::Mismatch => style("✗").red(),
            MatchStatus::Missing => style("?").yellow(),
        };
        let how = match (&detail.method, &detail.reason, detail.similarity) {
            (Some(method), _, _) => method.to_string(),
            (None, Some(reason), _) => reason.clone(),
            (None, None, Some(similarity)) => format!("similarity {:.2}", similarity),
            _ => String::new(),
        };
        println!(
            "{} {}: expected {}, extracted {} {}",
            marker,
            key,
            display_value(detail.expected.as_deref()),
            display_value(detail.extracted.as_deref()),
            style(how).dim()
        );
    }

    println!();
    println!(
        "{} Accuracy: {:.1}% ({} match, {} mismatch, {} missing of {})",
        style("ℹ").blue(),
        result.accuracy,
        result.matches,
        result.mismatches,
        result.missing,
        result.total_expected
    );
}

fn display_value(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", v),
        None => "null".to_string(),
    }
}
