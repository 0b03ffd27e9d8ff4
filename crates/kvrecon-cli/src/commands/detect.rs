//! Detect command - infer date format templates.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{info, warn};

use kvrecon_core::dates::{DetectionSource, Locale};

use super::{collect_inputs, load_config, load_registry, save_registry};

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    /// Date strings to inspect
    dates: Vec<String>,

    /// Read additional dates from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Locale hint for ambiguous dates (UK, EU, US)
    #[arg(short, long)]
    locale: Option<Locale>,

    /// Known-formats JSON file; read if present and written back
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

#[derive(Serialize)]
struct DetectionRow {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<DetectionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ambiguous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(args: DetectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(locale) = args.locale {
        config.dates.locale = locale;
    }

    let inputs = collect_inputs(&args.dates, args.file.as_deref())?;
    let mut registry = load_registry(args.registry.as_deref())?;
    let known_before = registry.len();
    let detector = config.detector();

    info!("Detecting {} dates with locale {}", inputs.len(), detector.locale());

    let rows: Vec<DetectionRow> = inputs
        .into_iter()
        .map(|input| match detector.detect(&input, &mut registry) {
            Ok(descriptor) => DetectionRow {
                template: Some(descriptor.template.to_string()),
                source: Some(descriptor.source),
                ambiguous: Some(descriptor.ambiguous),
                error: None,
                input,
            },
            Err(e) => {
                warn!("{}", e);
                DetectionRow {
                    template: None,
                    source: None,
                    ambiguous: None,
                    error: Some(e.to_string()),
                    input,
                }
            }
        })
        .collect();

    match args.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "locale": detector.locale(),
                "results": rows,
                "registry": registry,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print_text(&rows, &registry, known_before),
    }

    if let Some(path) = &args.registry {
        save_registry(path, &registry)?;
        info!("Saved {} formats to {}", registry.len(), path.display());
    }

    let failed = rows.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} dates could not be detected", failed, rows.len());
    }

    Ok(())
}

fn print_text(rows: &[DetectionRow], registry: &kvrecon_core::FormatRegistry, known_before: usize) {
    for row in rows {
        match (&row.template, &row.error) {
            (Some(template), _) => {
                let note = if row.ambiguous == Some(true) {
                    style(" (locale-dependent)").yellow().to_string()
                } else {
                    String::new()
                };
                println!("{} {} => {}{}", style("✓").green(), row.input, template, note);
            }
            (None, Some(error)) => println!("{} {}", style("✗").red(), error),
            (None, None) => {}
        }
    }

    println!();
    println!(
        "{} Registry: {} formats ({} new)",
        style("ℹ").blue(),
        registry.len(),
        registry.len() - known_before
    );
    for template in registry.iter() {
        println!("  - {}", template);
    }
}
