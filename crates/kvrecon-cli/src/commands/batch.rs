//! Batch command - merge and score every entry of a JSONL ground-truth file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use kvrecon_core::dates::{is_null_like, DateFormatDetector, FormatRegistry, Template};
use kvrecon_core::matching::{ComparisonEngine, ComparisonResult};
use kvrecon_core::merge::{HierarchyMerger, MergedRecord};
use kvrecon_core::models::record::deserialize_field_map;
use kvrecon_core::{ExtractionRecord, FieldMap};

use super::{load_config, load_registry, save_registry};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// JSONL ground-truth file, one entry per line
    #[arg(required = true)]
    input: PathBuf,

    /// Directory for per-entry JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write a summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Known-formats JSON file; read if present and written back
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Stop at the first failing entry
    #[arg(long)]
    fail_fast: bool,
}

/// One line of the ground-truth file.
#[derive(Debug, Deserialize)]
struct GroundTruthEntry {
    file_path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_field_map")]
    expected_kvp: FieldMap,
    #[serde(default)]
    extractions: Vec<ExtractionRecord>,
}

/// Result of processing a single entry.
#[derive(Debug, Serialize)]
struct EntryResult {
    line: usize,
    file_path: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    merged: Option<MergedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<ComparisonResult>,
    /// Date values re-rendered through the configured canonical template.
    #[serde(skip_serializing_if = "FieldMap::is_empty")]
    rendered_dates: FieldMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    processing_time_ms: u64,
}

/// Totals across all successfully scored entries.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub entries: usize,
    pub failed: usize,
    pub total_matches: usize,
    pub total_expected: usize,
    accuracy_sum: f64,
}

impl BatchSummary {
    pub fn add(&mut self, result: &ComparisonResult) {
        self.entries += 1;
        self.total_matches += result.matches;
        self.total_expected += result.total_expected;
        self.accuracy_sum += result.accuracy;
    }

    pub fn add_failure(&mut self) {
        self.failed += 1;
    }

    /// Matches over expected keys across every entry, as a percentage.
    pub fn micro_match_rate(&self) -> f64 {
        if self.total_expected == 0 {
            0.0
        } else {
            self.total_matches as f64 / self.total_expected as f64 * 100.0
        }
    }

    /// Mean of per-entry accuracy.
    pub fn macro_accuracy(&self) -> f64 {
        if self.entries == 0 {
            0.0
        } else {
            self.accuracy_sum / self.entries as f64
        }
    }
}

struct Pipeline {
    merger: HierarchyMerger,
    engine: ComparisonEngine,
    detector: DateFormatDetector,
    canonical: Template,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Ground truth file not found: {}", args.input.display()))?;
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    if lines.is_empty() {
        anyhow::bail!("No entries found in {}", args.input.display());
    }

    println!(
        "{} Found {} ground-truth entries",
        style("ℹ").blue(),
        lines.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Pipeline {
        merger: config.merger(),
        engine: config.comparison_engine(),
        detector: config.detector(),
        canonical: config.canonical_template()?,
    };
    let mut registry = load_registry(args.registry.as_deref())?;

    let pb = ProgressBar::new(lines.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(lines.len());
    let mut summary = BatchSummary::default();

    for (line, raw) in lines {
        let entry_start = Instant::now();
        let outcome = serde_json::from_str::<GroundTruthEntry>(raw)
            .map_err(anyhow::Error::from)
            .and_then(|entry| {
                let file_path = entry
                    .file_path
                    .clone()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| anyhow::anyhow!("missing 'file_path'"))?;
                Ok((file_path, entry))
            });

        let processing_time_ms = || entry_start.elapsed().as_millis() as u64;

        let mut result = match outcome {
            Ok((file_path, entry)) => {
                let (merged, comparison, rendered_dates) =
                    pipeline.process(&entry, &mut registry);
                EntryResult {
                    line,
                    file_path,
                    status: "success",
                    merged: Some(merged),
                    comparison: Some(comparison),
                    rendered_dates,
                    error: None,
                    processing_time_ms: processing_time_ms(),
                }
            }
            Err(e) => {
                let error_msg = format!("line {}: {}", line, e);
                if args.fail_fast {
                    error!("{}", error_msg);
                    pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Skipping entry at {}", error_msg);
                EntryResult {
                    line,
                    file_path: String::new(),
                    status: "error",
                    merged: None,
                    comparison: None,
                    rendered_dates: FieldMap::new(),
                    error: Some(e.to_string()),
                    processing_time_ms: processing_time_ms(),
                }
            }
        };

        if let Some(ref output_dir) = args.output_dir {
            if let Err(e) = write_entry(output_dir, &result) {
                let error_msg = format!("line {}: {:#}", line, e);
                if args.fail_fast {
                    error!("{}", error_msg);
                    pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Keeping going after {}", error_msg);
                result.status = "error";
                result.error = Some(match result.error.take() {
                    Some(previous) => format!("{}; {:#}", previous, e),
                    None => format!("{:#}", e),
                });
            }
        }

        match (&result.comparison, &result.error) {
            (Some(comparison), None) => summary.add(comparison),
            _ => summary.add_failure(),
        }

        results.push(result);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(ref summary_path) = args.summary {
        write_summary(summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    if let Some(ref path) = args.registry {
        save_registry(path, &registry)?;
    }

    println!();
    println!(
        "{} Processed {} entries in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(summary.entries).green(),
        style(summary.failed).red()
    );
    println!(
        "   Matches: {}/{} ({:.1}% micro, {:.1}% macro)",
        summary.total_matches,
        summary.total_expected,
        summary.micro_match_rate(),
        summary.macro_accuracy()
    );
    println!("   Date formats seen: {}", registry.len());
    for template in registry.iter() {
        println!("     - {}", template);
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed entries:").red());
        for result in &failed {
            println!(
                "  - line {}: {}",
                result.line,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

impl Pipeline {
    /// Merge the entry's extractions over the expected keys and score them.
    fn process(
        &self,
        entry: &GroundTruthEntry,
        registry: &mut FormatRegistry,
    ) -> (MergedRecord, ComparisonResult, FieldMap) {
        let keys: Vec<String> = entry.expected_kvp.keys().cloned().collect();
        let merged = self.merger.merge(&entry.extractions, &keys);
        let comparison = self.engine.compare(&merged.extracted_data(), &entry.expected_kvp);

        let date_keys: Vec<&String> = keys.iter().filter(|k| self.engine.is_date_field(k)).collect();

        // Every raw date value teaches the registry, not only the winners.
        for record in &entry.extractions {
            for key in &date_keys {
                if let Some(value) = record.value(key).filter(|v| !is_null_like(v)) {
                    if let Err(e) = self.detector.detect(value, registry) {
                        debug!("{}", e);
                    }
                }
            }
        }

        let mut rendered = FieldMap::new();
        for key in date_keys {
            if let Some(value) = merged.value(key).filter(|v| !is_null_like(v)) {
                let rendered_value = self.detector.reformat(value, registry, &self.canonical).ok();
                rendered.insert(key.clone(), rendered_value);
            }
        }

        (merged, comparison, rendered)
    }
}

fn write_entry(output_dir: &Path, result: &EntryResult) -> anyhow::Result<()> {
    let output_path = output_dir.join(output_name(result));
    fs::write(&output_path, serde_json::to_string_pretty(result)?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn output_name(result: &EntryResult) -> String {
    let stem = Path::new(&result.file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("entry");
    format!("{:04}_{}.json", result.line, stem)
}

fn write_summary(path: &Path, results: &[EntryResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "line",
        "file_path",
        "status",
        "matches",
        "mismatches",
        "missing",
        "total_expected",
        "total_extracted",
        "accuracy",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let line = result.line.to_string();
        if let Some(comparison) = &result.comparison {
            wtr.write_record([
                line.as_str(),
                &result.file_path,
                result.status,
                &comparison.matches.to_string(),
                &comparison.mismatches.to_string(),
                &comparison.missing.to_string(),
                &comparison.total_expected.to_string(),
                &comparison.total_extracted.to_string(),
                &format!("{:.2}", comparison.accuracy),
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        } else {
            wtr.write_record([
                line.as_str(),
                &result.file_path,
                result.status,
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvrecon_core::{compare_extracted_with_expected, ReconConfig};

    fn pipeline(config: &ReconConfig) -> Pipeline {
        Pipeline {
            merger: config.merger(),
            engine: config.comparison_engine(),
            detector: config.detector(),
            canonical: config.canonical_template().unwrap(),
        }
    }

    fn map(pairs: &[(&str, Option<&str>)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_summary_micro_and_macro() {
        let mut summary = BatchSummary::default();

        // 1 of 2 expected keys
        let half = compare_extracted_with_expected(
            &map(&[("a", Some("x")), ("b", None)]),
            &map(&[("a", Some("x")), ("b", Some("y"))]),
        );
        // 4 of 4
        let full_map = map(&[("a", Some("1")), ("b", Some("2")), ("c", Some("3")), ("d", None)]);
        let full = compare_extracted_with_expected(&full_map, &full_map);

        summary.add(&half);
        summary.add(&full);
        summary.add_failure();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_matches, 5);
        assert_eq!(summary.total_expected, 6);
        assert!((summary.micro_match_rate() - 500.0 / 6.0).abs() < 1e-9);
        assert!((summary.macro_accuracy() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::default();
        assert_eq!(summary.micro_match_rate(), 0.0);
        assert_eq!(summary.macro_accuracy(), 0.0);
    }

    #[test]
    fn test_pipeline_feeds_registry() {
        let pipeline = pipeline(&ReconConfig::default());

        let entry: GroundTruthEntry = serde_json::from_str(
            r#"{
                "file_path": "/claims/0001.msg",
                "expected_kvp": {"first_name": "John", "dob": "01-11-1996"},
                "extractions": [
                    {"source": "police.pdf", "document_type": "Police Report / Accident Report",
                     "extracted_data": {"first_name": "John", "dob": null}},
                    {"source": "invoice.pdf", "document_type": "Interim Invoice",
                     "extracted_data": {"first_name": "Jimmy", "dob": "1996-11-01"}}
                ]
            }"#,
        )
        .unwrap();

        let mut registry = FormatRegistry::new();
        let (merged, comparison, rendered) = pipeline.process(&entry, &mut registry);

        assert_eq!(merged.value("first_name"), Some("John"));
        assert_eq!(merged.value("dob"), Some("1996-11-01"));
        assert_eq!(comparison.matches, 2);
        assert!(registry.contains("%Y-%m-%d"));
        assert_eq!(rendered.get("dob"), Some(&Some("1996-11-01".to_string())));
    }

    #[test]
    fn test_pipeline_renders_explicit_date_fields_only() {
        let mut config = ReconConfig::default();
        config.matching.date_fields = Some(vec!["loss".to_string()]);
        let pipeline = pipeline(&config);

        let entry: GroundTruthEntry = serde_json::from_str(
            r#"{
                "file_path": "/claims/0002.msg",
                "expected_kvp": {"loss": "13/10/2024", "dob": "1996-11-01"},
                "extractions": [
                    {"source": "email.msg", "document_type": "Email",
                     "extracted_data": {"loss": "2024-10-13", "dob": "1996-11-01"}}
                ]
            }"#,
        )
        .unwrap();

        let mut registry = FormatRegistry::new();
        let (_, comparison, rendered) = pipeline.process(&entry, &mut registry);

        assert_eq!(comparison.matches, 2);
        assert_eq!(rendered.get("loss"), Some(&Some("2024-10-13".to_string())));
        assert!(!rendered.contains_key("dob"));
    }

    #[test]
    fn test_output_name() {
        let result = EntryResult {
            line: 7,
            file_path: "/data/claims/abc.msg".to_string(),
            status: "success",
            merged: None,
            comparison: None,
            rendered_dates: FieldMap::new(),
            error: None,
            processing_time_ms: 0,
        };
        assert_eq!(output_name(&result), "0007_abc.json");
    }
}
