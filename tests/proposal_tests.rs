//! Kits, proposal, describe, extract and catalog store tests

mod common;

use common::{quote_to_file, read_json, ridge, write_file, SIMPLE_JOB};
use predicates::prelude::*;
use tempfile::TempDir;

/// Project config pointing the catalog store into `tmp` and the extractor at `command`
fn project_config(tmp: &TempDir, command: Option<&str>) {
    let mut config = String::from("store_dir: store\n");
    if let Some(command) = command {
        config.push_str(&format!("extractor:\n  command: \"{}\"\n  timeout_secs: 10\n", command));
    }
    write_file(tmp, "ridge.yaml", &config);
}

// ============================================================================
// Kit Tests
// ============================================================================

#[test]
fn test_kits_group_small_items() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    ridge(&tmp)
        .arg("kits")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Flashing Kit"))
        .stdout(predicate::str::contains("Drip Edge"))
        .stdout(predicate::str::contains("Brava Field Tile"))
        .stdout(predicate::str::contains("Snow Guards (optional)"));
}

#[test]
fn test_kits_json_keeps_totals() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    let estimate = read_json(&path);
    let output = ridge(&tmp)
        .args(["kits", "-f", "json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let organized: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let lines = organized["lines"].as_array().unwrap();

    let base: f64 = lines
        .iter()
        .filter(|l| l["is_optional"].as_bool() != Some(true))
        .map(|l| l["total"].as_f64().unwrap())
        .sum();
    let expected: f64 = estimate["totals"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_f64().unwrap())
        .sum();
    assert!((base - expected).abs() < 0.01);
}

#[test]
fn test_kits_ungrouped() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    let output = ridge(&tmp)
        .args(["kits", "--ungrouped", "-f", "json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let organized: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // Tile, drip edge, labor, sundries and the optional snow guards
    assert_eq!(organized["lines"].as_array().unwrap().len(), 5);
}

#[test]
fn test_kits_llm_without_extractor_fails() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    ridge(&tmp)
        .args(["kits", "--llm"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No extractor configured"));
}

#[test]
fn test_kits_llm_failure_falls_back_to_one_line_per_item() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    project_config(&tmp, Some("exit 3"));
    let output = ridge(&tmp)
        .args(["kits", "--llm", "-f", "json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let organized: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(organized["lines"].as_array().unwrap().len(), 5);
}

// ============================================================================
// Proposal Tests
// ============================================================================

#[test]
fn test_proposal_text() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    ridge(&tmp)
        .arg("proposal")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ROOFING PROPOSAL"))
        .stdout(predicate::str::contains("Prepared for: Dana Whitfield"))
        .stdout(predicate::str::contains("* Flashing Kit"))
        .stdout(predicate::str::contains("Includes: Drip Edge"))
        .stdout(predicate::str::contains("OPTIONAL ADD-ONS"))
        .stdout(predicate::str::contains("* Snow Guards"));
}

#[test]
fn test_proposal_written_to_file() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    ridge(&tmp)
        .args(["proposal", "--ungrouped", "-o", "proposal.txt"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Proposal written"));
    let text = std::fs::read_to_string(tmp.path().join("proposal.txt")).unwrap();
    assert!(text.contains("* Drip Edge"));
    assert!(!text.contains("Flashing Kit"));
}

// ============================================================================
// Describe Tests
// ============================================================================

#[test]
fn test_describe_writes_missing_descriptions() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    project_config(&tmp, Some("echo Durable aluminum trim for the roof edge"));

    ridge(&tmp)
        .args(["describe", "--write"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("drip-edge"));

    let estimate = read_json(&path);
    let drip = estimate["line_items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == "drip-edge")
        .unwrap();
    assert_eq!(
        drip["proposal_description"],
        "Durable aluminum trim for the roof edge"
    );
    // Existing descriptions are kept
    let tile = &estimate["line_items"][0];
    assert!(tile["proposal_description"]
        .as_str()
        .unwrap()
        .starts_with("Brava synthetic field tile"));
}

#[test]
fn test_describe_store_needs_user() {
    let tmp = TempDir::new().unwrap();
    let path = quote_to_file(&tmp, SIMPLE_JOB);
    ridge(&tmp)
        .args(["describe", "--store"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--store needs a user"));
}

// ============================================================================
// Extract Tests
// ============================================================================

#[test]
fn test_extract_measurements() {
    let tmp = TempDir::new().unwrap();
    write_file(
        &tmp,
        "reply.json",
        r#"{"total_squares": 24.5, "predominant_pitch": "8 / 12", "eave_length": 140}"#,
    );
    write_file(&tmp, "report.pdf", "%PDF-1.4");
    project_config(&tmp, Some("cat reply.json"));

    ridge(&tmp)
        .args(["extract", "measurements", "report.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total_squares: 24.5"))
        .stdout(predicate::str::contains("predominant_pitch: 8/12"))
        .stdout(predicate::str::contains("eave_length: 140"));
}

#[test]
fn test_extract_measurements_rejects_bad_reply() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp, "reply.json", r#"{"total_squares": -3}"#);
    write_file(&tmp, "report.pdf", "%PDF-1.4");
    project_config(&tmp, Some("cat reply.json"));

    ridge(&tmp)
        .args(["extract", "measurements", "report.pdf"])
        .assert()
        .failure();
}

// ============================================================================
// Catalog Store Tests
// ============================================================================

#[test]
fn test_catalog_list_builtin() {
    let tmp = TempDir::new().unwrap();
    ridge(&tmp)
        .args(["catalog", "list", "--category", "labor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("roofing-labor"))
        .stdout(predicate::str::contains("brava-field-tile").not());
}

#[test]
fn test_catalog_list_csv_quotes_names() {
    let tmp = TempDir::new().unwrap();
    project_config(&tmp, None);
    ridge(&tmp)
        .args([
            "--user", "alex", "catalog", "add", "gutter-guard", "-n", "Gutter Guard, 5in", "-p",
            "7.5", "-c", "accessories",
        ])
        .assert()
        .success();

    ridge(&tmp)
        .args(["--user", "alex", "catalog", "list", "--stored", "-f", "csv"])
        .assert()
        .success()
        .stdout("id,name,category,unit,price\ngutter-guard,\"Gutter Guard, 5in\",accessories,each,7.5\n");
}

#[test]
fn test_catalog_add_needs_user() {
    let tmp = TempDir::new().unwrap();
    project_config(&tmp, None);
    ridge(&tmp)
        .args(["catalog", "add", "gutter-guard", "-n", "Gutter Guard", "-p", "7.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a user"));
}

#[test]
fn test_catalog_add_list_rm() {
    let tmp = TempDir::new().unwrap();
    project_config(&tmp, None);

    ridge(&tmp)
        .args([
            "--user", "alex", "catalog", "add", "gutter-guard", "-n", "Gutter Guard", "-p", "7.5",
            "-c", "accessories",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved gutter-guard"));
    assert!(tmp.path().join("store/alex.yaml").exists());

    ridge(&tmp)
        .args(["--user", "alex", "catalog", "list", "--stored"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gutter Guard"));

    // Merged with the built-in catalog for this user only
    ridge(&tmp)
        .args(["--user", "alex", "catalog", "list", "-s", "gutter", "--count"])
        .assert()
        .success()
        .stdout("1\n");
    ridge(&tmp)
        .args(["catalog", "list", "-s", "gutter", "--count"])
        .assert()
        .success()
        .stdout("0\n");

    ridge(&tmp)
        .args(["--user", "alex", "catalog", "rm", "gutter-guard"])
        .assert()
        .success();
    ridge(&tmp)
        .args(["--user", "alex", "catalog", "list", "--stored"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching catalog items"));
}

#[test]
fn test_stored_price_overrides_builtin_in_quote() {
    let tmp = TempDir::new().unwrap();
    project_config(&tmp, None);
    write_file(
        &tmp,
        "prices.yaml",
        "items:\n  - id: drip-edge\n    name: Drip Edge\n    unit: each\n    price: 12.0\n    category: materials\n",
    );
    ridge(&tmp)
        .args(["--user", "alex", "catalog", "import", "prices.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 new"));

    let job = write_file(&tmp, "job.yaml", SIMPLE_JOB);
    let output = ridge(&tmp)
        .args(["--user", "alex", "quote", "-f", "json"])
        .arg(&job)
        .output()
        .unwrap();
    assert!(output.status.success());
    let estimate: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let drip = estimate["line_items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == "drip-edge")
        .unwrap();
    assert_eq!(drip["total"].as_f64().unwrap(), 120.0);
}

#[test]
fn test_catalog_rejects_bad_user_name() {
    let tmp = TempDir::new().unwrap();
    project_config(&tmp, None);
    ridge(&tmp)
        .args(["--user", "../etc", "catalog", "list", "--stored"])
        .assert()
        .failure();
}
