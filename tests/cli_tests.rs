//! CLI integration tests
//!
//! Runs the `xlpivot` binary against the fixtures in `test-data/`.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PROJECT: &str = "test-data/project.yaml";

fn xlpivot() -> Command {
    let mut cmd = Command::cargo_bin("xlpivot").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("XLPIVOT_LANGUAGE")
        .env("CLICOLOR", "0")
        .env("NO_COLOR", "1");
    cmd
}

/// A throwaway project whose dataset is `data` (YAML)
fn temp_project(data: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("data.yaml"), data).unwrap();
    let config = dir.path().join("project.yaml");
    fs::write(
        &config,
        "project:\n  properties:\n    name: tmp\n  dirs:\n    output: out\n  paths:\n    data_file: data.yaml\n",
    )
    .unwrap();
    (dir, config)
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    xlpivot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("xlpivot"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    xlpivot()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("xlpivot"));
}

#[test]
fn test_subcommand_help() {
    for (sub, text) in [
        ("export", "Build every report"),
        ("evaluate", "Print the result table"),
        ("validate", "Check the dataset"),
    ] {
        xlpivot()
            .args([sub, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains(text));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_export_writes_workbook() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("league.xlsx");

    xlpivot()
        .args(["export", PROJECT, "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Export Complete"))
        .stdout(predicate::str::contains("Reports written: 3"));

    assert!(output.exists());
}

#[test]
fn test_export_default_output_name() {
    let (dir, config) = temp_project(
        "criteria:\n  - { criterion_key: A, dimension_1: r, dimension_2: c, value: 1 }\nreports:\n  - { query_name: q, formula: A }\n",
    );

    xlpivot()
        .args(["export", "-l", "fr"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Language: FR"));

    let written: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("tmp_pivots_FR_"));
    assert!(written[0].ends_with(".xlsx"));
}

#[test]
fn test_export_fails_on_duplicates() {
    let (dir, config) = temp_project(
        "criteria:\n  - { criterion_key: A, dimension_1: r, dimension_2: c, value: 1 }\n  - { criterion_key: A, dimension_1: r, dimension_2: c, value: 2 }\n",
    );
    let output = dir.path().join("never.xlsx");

    xlpivot()
        .arg("export")
        .arg(&config)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicates exist in the data"));

    assert!(!output.exists());
}

#[test]
fn test_export_rejects_unknown_language() {
    xlpivot()
        .args(["export", PROJECT, "-l", "XX"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported language"));
}

#[test]
fn test_export_missing_config() {
    xlpivot()
        .args(["export", "test-data/nope.yaml"])
        .assert()
        .failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// EVALUATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_evaluate_table() {
    xlpivot()
        .args(["evaluate", PROJECT, "C_2 + C_3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("North"))
        .stdout(predicate::str::contains("2023"))
        .stdout(predicate::str::contains("110"));
}

#[test]
fn test_evaluate_json() {
    let output = xlpivot()
        .args(["evaluate", PROJECT, "C_1", "--json", "-l", "DE"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["formula"], "C_1");
    assert_eq!(json["language"], "DE");
    assert_eq!(json["columns"], serde_json::json!(["2021", "2022", "2023"]));
    assert_eq!(json["rows"][0]["key"], "north");
    assert_eq!(json["rows"][0]["label"], "Nord");
    assert_eq!(json["rows"][0]["kind"], "data");
    assert_eq!(json["rows"][0]["cells"], serde_json::json!([100.0, 110.0, 120.0]));
    // the initial-state row is part of a raw evaluation
    assert_eq!(json["rows"][2]["key"], "zz_Init");
    assert_eq!(json["rows"][2]["cells"][1], serde_json::Value::Null);
}

#[test]
fn test_evaluate_bad_formula_reports_no_columns() {
    xlpivot()
        .args(["evaluate", PROJECT, "C_1 ^ 2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No columns with values"));
}

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_validate_fixture_project() {
    xlpivot()
        .args(["validate", PROJECT])
        .assert()
        .success()
        .stdout(predicate::str::contains("All report formulas are valid"))
        .stdout(predicate::str::contains("draft (no formula, skipped)"));
}

#[test]
fn test_validate_reports_unknown_criterion_with_suggestion() {
    let (_dir, config) = temp_project(
        "criteria:\n  - { criterion_key: Revenue, dimension_1: r, dimension_2: c, value: 1 }\nreports:\n  - { query_name: q, formula: \"revenue * 2\" }\n  - { query_name: bad, formula: \"Revenue +\" }\n",
    );

    xlpivot()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Found 2 formula problems"))
        .stdout(predicate::str::contains("did you mean 'Revenue'"))
        .stderr(predicate::str::contains("Validation error: 2 formula problems found"));
}

#[test]
fn test_validate_row_domain_mismatch() {
    let (_dir, config) = temp_project(
        "criteria:\n  - { criterion_key: A, dimension_1: r1, dimension_2: c, value: 1 }\n  - { criterion_key: A, dimension_1: r2, dimension_2: c, value: 1 }\n  - { criterion_key: B, dimension_1: r1, dimension_2: c, value: 1 }\n",
    );

    xlpivot()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Pivot check failed"));
}
