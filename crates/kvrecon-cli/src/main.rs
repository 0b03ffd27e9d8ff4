//! CLI application for reconciling key-value extractions.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, compare, config, detect, merge, normalize};

/// kvrecon - Merge multi-source extractions and score them against ground truth
#[derive(Parser)]
#[command(name = "kvrecon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the format template of date strings
    Detect(detect::DetectArgs),

    /// Normalize dates or re-render them into a template
    Normalize(normalize::NormalizeArgs),

    /// Merge per-source extractions using the document-type hierarchy
    Merge(merge::MergeArgs),

    /// Compare extracted values against expected values
    Compare(compare::CompareArgs),

    /// Merge and score every entry of a JSONL ground-truth file
    Batch(batch::BatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Detect(args) => detect::run(args, config_path).await,
        Commands::Normalize(args) => normalize::run(args, config_path).await,
        Commands::Merge(args) => merge::run(args, config_path).await,
        Commands::Compare(args) => compare::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
