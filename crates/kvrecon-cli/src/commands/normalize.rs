//! Normalize command - canonical dates or re-rendering into a template.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::warn;

use kvrecon_core::dates::{normalize_date, Locale, Template};

use super::{collect_inputs, load_config, load_registry, save_registry};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Date strings to normalize
    dates: Vec<String>,

    /// Read additional dates from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Re-render into this template (e.g. "%d/%m/%Y") using format detection
    #[arg(short, long)]
    to: Option<String>,

    /// Locale hint for ambiguous dates (UK, EU, US); only used with --to
    #[arg(short, long, requires = "to")]
    locale: Option<Locale>,

    /// Known-formats JSON file, read if present and written back; only used with --to
    #[arg(short, long, requires = "to")]
    registry: Option<PathBuf>,
}

pub async fn run(args: NormalizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(locale) = args.locale {
        config.dates.locale = locale;
    }

    let inputs = collect_inputs(&args.dates, args.file.as_deref())?;
    let mut failed = 0usize;

    match &args.to {
        Some(target) => {
            let desired = Template::parse(target)?;
            let detector = config.detector();
            let mut registry = load_registry(args.registry.as_deref())?;

            for input in &inputs {
                match detector.reformat(input, &mut registry, &desired) {
                    Ok(rendered) => println!("{}\t{}", input, rendered),
                    Err(e) => {
                        warn!("{}", e);
                        println!("{}\t{}", input, style("<unparseable>").red());
                        failed += 1;
                    }
                }
            }

            if let Some(path) = &args.registry {
                save_registry(path, &registry)?;
            }
        }
        None => {
            for input in &inputs {
                match normalize_date(input) {
                    Some(canonical) => println!("{}\t{}", input, canonical),
                    None => {
                        println!("{}\t{}", input, style("<unparseable>").red());
                        failed += 1;
                    }
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} dates could not be normalized", failed, inputs.len());
    }

    Ok(())
}
