use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with an isolated, empty config file.
fn kvrecon(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }
    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_detect_uk_date() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["detect", "27/06/2023", "--locale", "UK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("27/06/2023 => %d/%m/%Y"))
        .stdout(predicate::str::contains("Registry: 1 formats (1 new)"));
}

#[test]
fn test_detect_persists_registry() {
    let dir = TempDir::new().unwrap();
    let registry = dir.path().join("formats.json");

    kvrecon(&dir)
        .args(["detect", "27/06/2023", "--locale", "UK", "--registry"])
        .arg(&registry)
        .assert()
        .success();

    kvrecon(&dir)
        .args(["detect", "2023-06-27 15:37:38+00:00", "--registry"])
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("%Y-%m-%d %H:%M:%S%z"))
        .stdout(predicate::str::contains("Registry: 2 formats (1 new)"));

    let saved: Vec<String> = serde_json::from_str(&fs::read_to_string(&registry).unwrap()).unwrap();
    assert_eq!(saved, vec!["%Y-%m-%d %H:%M:%S%z", "%d/%m/%Y"]);
}

#[test]
fn test_detect_json_output() {
    let dir = TempDir::new().unwrap();
    let output = kvrecon(&dir)
        .args(["detect", "13 October 2024", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["results"][0]["template"], "%d %B %Y");
    assert_eq!(json["results"][0]["source"], "text_layout");
    assert_eq!(json["locale"], "US");
}

#[test]
fn test_detect_reports_undetected() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["detect", "sometime soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 dates could not be detected"));
}

#[test]
fn test_detect_reads_file() {
    let dir = TempDir::new().unwrap();
    let dates = write(dir.path(), "dates.txt", "2024-01-02\n\n15.08.2023\n");

    kvrecon(&dir)
        .args(["detect", "--locale", "EU", "--file"])
        .arg(&dates)
        .assert()
        .success()
        .stdout(predicate::str::contains("15.08.2023 => %d.%m.%Y"))
        .stdout(predicate::str::contains("Registry: 2 formats"));
}

#[test]
fn test_normalize_canonical() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["normalize", "13th of October 2024", "10/13/24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13th of October 2024\t2024-10-13"))
        .stdout(predicate::str::contains("10/13/24\t2024-10-13"));
}

#[test]
fn test_normalize_to_template() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["normalize", "2023-06-27 15:37:38+00:00", "--to", "%d/%m/%Y %H:%M"])
        .assert()
        .success()
        .stdout(predicate::str::contains("27/06/2023 15:37"));
}

#[test]
fn test_normalize_rejects_bad_template() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["normalize", "2023-06-27", "--to", "%Y-%Q"])
        .assert()
        .failure();
}

#[test]
fn test_normalize_locale_requires_target_template() {
    let dir = TempDir::new().unwrap();

    kvrecon(&dir)
        .args(["normalize", "05/06/2023", "--locale", "UK"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--to"));

    kvrecon(&dir)
        .args(["normalize", "05/06/2023", "--locale", "US", "--to", "%Y-%m-%d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("05/06/2023\t2023-05-06"));
}

const RECORDS: &str = r#"[
    {"source": "police.pdf", "document_type": "Police Report / Accident Report",
     "extracted_data": {"first_name": "John", "dob": null},
     "confidence_scores": {"first_name": 0.9}},
    {"source": "invoice.pdf", "document_type": "Interim Invoice",
     "extracted_data": {"first_name": "Jimmy", "dob": "11-01-1996"}}
]"#;

#[test]
fn test_merge_values_only() {
    let dir = TempDir::new().unwrap();
    let records = write(dir.path(), "records.json", RECORDS);

    let output = kvrecon(&dir)
        .arg("merge")
        .arg(&records)
        .arg("--values-only")
        .output()
        .unwrap();

    assert!(output.status.success());
    let merged: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(merged, serde_json::json!({"dob": "11-01-1996", "first_name": "John"}));
}

#[test]
fn test_merge_glob_and_keys() {
    let dir = TempDir::new().unwrap();
    let sources = dir.path().join("sources");
    fs::create_dir_all(&sources).unwrap();
    write(
        &sources,
        "a.json",
        r#"{"source": "a.pdf", "document_type": "Email", "extracted_data": {"policy": "P-1", "insured": "Acme"}}"#,
    );
    write(
        &sources,
        "b.json",
        r#"{"source": "b.pdf", "document_type": "Other", "extracted_data": {"policy": "P-2"}}"#,
    );
    let output_path = dir.path().join("merged.json");

    kvrecon(&dir)
        .arg("merge")
        .arg(format!("{}/*.json", sources.display()))
        .args(["--keys", "policy,claim"])
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 2 keys from 2 records"));

    let merged: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(merged["fields"]["policy"]["value"], "P-1");
    assert_eq!(merged["fields"]["policy"]["losing"][0]["value"], "P-2");
    assert_eq!(merged["fields"]["claim"]["note"], "not found in any source");
    assert!(merged["fields"].get("insured").is_none());
}

#[test]
fn test_compare_half_accuracy() {
    let dir = TempDir::new().unwrap();
    let extracted = write(dir.path(), "extracted.json", r#"{"first_name": "John", "dob": "11-01-1996"}"#);
    let expected = write(dir.path(), "expected.json", r#"{"first_name": "John", "dob": "01-01-1995"}"#);

    kvrecon(&dir)
        .arg("compare")
        .arg(&extracted)
        .arg(&expected)
        .assert()
        .success()
        .stdout(predicate::str::contains("Accuracy: 50.0%"))
        .stdout(predicate::str::contains("1 match, 1 mismatch, 0 missing of 2"));
}

#[test]
fn test_compare_json_with_date_fields() {
    let dir = TempDir::new().unwrap();
    let extracted = write(
        dir.path(),
        "extracted.json",
        r#"{"extracted_data": {"inception": "13/10/2024", "insured": "Acme Insurance Ltd"}}"#,
    );
    let expected = write(
        dir.path(),
        "expected.json",
        r#"{"inception": "2024-10-13", "insured": "Acme Insurance Limited"}"#,
    );

    let output = kvrecon(&dir)
        .arg("compare")
        .arg(&extracted)
        .arg(&expected)
        .args(["--date-fields", "inception", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["match_types"]["inception"], "date_match");
    assert_eq!(result["match_types"]["insured"], "fuzzy_match_0.90");
    assert_eq!(result["accuracy"], 100.0);
}

#[test]
fn test_compare_rejects_bad_threshold() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "kv.json", r#"{"a": "b"}"#);

    kvrecon(&dir)
        .arg("compare")
        .arg(&file)
        .arg(&file)
        .args(["--threshold", "2.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fuzzy_threshold"));
}

const GROUND_TRUTH: &str = r#"{"file_path": "/claims/0001.msg", "expected_kvp": {"first_name": "John", "dob": "11-01-1996"}, "extractions": [{"source": "police.pdf", "document_type": "Police Report / Accident Report", "extracted_data": {"first_name": "John", "dob": null}}, {"source": "invoice.pdf", "document_type": "Interim Invoice", "extracted_data": {"first_name": "Jimmy", "dob": "11-01-1996"}}]}
this line is not json
{"file_path": "/claims/0002.msg", "expected_kvp": {"policy_number": "PN-77", "premium": "1000"}, "extractions": [{"source": "slip.pdf", "document_type": "Email", "extracted_data": {"policy_number": "PN-77", "premium": "$1,000.00"}}]}
"#;

#[test]
fn test_batch_continues_past_errors() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "truth.jsonl", GROUND_TRUTH);
    let output_dir = dir.path().join("out");
    let summary = dir.path().join("summary.csv");
    let registry = dir.path().join("formats.json");

    kvrecon(&dir)
        .arg("batch")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--summary")
        .arg(&summary)
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 1 failed"))
        .stdout(predicate::str::contains("Matches: 4/4 (100.0% micro, 100.0% macro)"));

    let csv = fs::read_to_string(&summary).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("line,file_path,status"));
    assert!(lines[1].starts_with("1,/claims/0001.msg,success,2,0,0,2"));
    assert!(lines[2].starts_with("2,,error"));

    let first: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join("0001_0001.json")).unwrap()).unwrap();
    assert_eq!(first["merged"]["fields"]["first_name"]["value"], "John");
    assert_eq!(first["comparison"]["accuracy"], 100.0);
    assert_eq!(first["rendered_dates"]["dob"], "1996-11-01");
    assert!(output_dir.join("0002_entry.json").exists());

    let saved: Vec<String> = serde_json::from_str(&fs::read_to_string(&registry).unwrap()).unwrap();
    assert_eq!(saved, vec!["%m-%d-%Y"]);
}

#[test]
fn test_batch_records_unwritable_output() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "truth.jsonl", GROUND_TRUTH);
    let output_dir = dir.path().join("out");
    // A directory where the first entry's result file should go.
    fs::create_dir_all(output_dir.join("0001_0001.json")).unwrap();
    let summary = dir.path().join("summary.csv");

    kvrecon(&dir)
        .arg("batch")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 2 failed"))
        .stdout(predicate::str::contains("line 1: Failed to write"));

    let csv = fs::read_to_string(&summary).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert!(lines[1].starts_with("1,/claims/0001.msg,error,2,0,0,2"));
    assert!(lines[1].contains("Failed to write"));
    assert!(lines[3].starts_with("3,/claims/0002.msg,success"));
    assert!(output_dir.join("0003_0002.json").exists());

    kvrecon(&dir)
        .arg("batch")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--fail-fast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed: line 1"));
}

#[test]
fn test_batch_fail_fast() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "truth.jsonl", GROUND_TRUTH);

    kvrecon(&dir)
        .arg("batch")
        .arg(&input)
        .arg("--fail-fast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed: line 2"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("conf").join("kvrecon.json");

    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "set", "dates.locale", "UK"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "get", "dates.locale"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"UK\""));

    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "set", "matching.fuzzy_threshold", "3"])
        .assert()
        .failure();

    let mut cmd = Command::cargo_bin("kvrecon").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
