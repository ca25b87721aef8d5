//! CLI integration tests for mouldsight-cli.
//!
//! These tests run the actual binary against synthetic part images and check
//! outputs and exit codes.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the mouldsight binary.
fn mouldsight() -> Command {
    let mut cmd = Command::cargo_bin("mouldsight").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("MOULDSIGHT_MIN_DEFECT_AREA")
        .env_remove("MOULDSIGHT_SSIM_WINDOW");
    cmd
}

/// Mid-gray plate, optionally with a black square of `side` px at (10, 10).
fn write_plate(dir: &Path, name: &str, side: u32) -> PathBuf {
    let mut image = GrayImage::from_pixel(200, 200, Luma([128]));
    for y in 10..10 + side {
        for x in 10..10 + side {
            image.put_pixel(x, y, Luma([0]));
        }
    }
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    mouldsight()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Master-sample visual inspection"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("catalog"));
}

#[test]
fn test_version_displays_version() {
    mouldsight()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mouldsight"));
}

#[test]
fn test_help_shows_exit_codes() {
    mouldsight()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("64  invalid request"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_compare_help_shows_options() {
    mouldsight()
        .args(["compare", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REFERENCE"))
        .stdout(predicate::str::contains("CANDIDATE"))
        .stdout(predicate::str::contains("--min-area"))
        .stdout(predicate::str::contains("--config"));
}

// ============================================================================
// Compare Tests
// ============================================================================

#[test]
fn test_compare_identical_parts_passes() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);

    mouldsight()
        .args(["compare"])
        .arg(&master)
        .arg(&master)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("No defects detected"));
}

#[test]
fn test_compare_defective_part_exits_65() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let part = write_plate(temp.path(), "part.png", 40);

    mouldsight()
        .arg("compare")
        .arg(&master)
        .arg(&part)
        .assert()
        .code(65)
        .stdout(predicate::str::contains("MINOR DIFFERENCES"))
        .stdout(predicate::str::contains("Fix instructions:"))
        .stdout(predicate::str::contains("Large defects detected - check for:"));
}

#[test]
fn test_compare_json_output() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let part = write_plate(temp.path(), "part.png", 40);

    let output = mouldsight()
        .args(["--format", "json", "compare"])
        .arg(&master)
        .arg(&part)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(65));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["severity"], "minor");
    assert_eq!(json["defect_count"], 1);
    assert_eq!(json["approved"], false);
    assert!(json["similarity_score"].as_f64().unwrap() < 95.0);
    assert!(json["defect_regions"][0]["area"].as_u64().unwrap() > 1000);
}

#[test]
fn test_compare_records_sample_key() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);

    let output = mouldsight()
        .args(["--format", "json", "compare", "--sample-key", "MS-042"])
        .arg(&master)
        .arg(&master)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["master_sample"]["key"], "MS-042");
    assert_eq!(json["master_sample"]["version"], 1);
}

#[test]
fn test_compare_min_area_override_hides_region() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let part = write_plate(temp.path(), "part.png", 40);

    let output = mouldsight()
        .args(["--format", "json", "compare", "--min-area", "100000"])
        .arg(&master)
        .arg(&part)
        .output()
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["defect_count"], 0);
}

#[test]
fn test_quiet_mode_prints_nothing() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let part = write_plate(temp.path(), "part.png", 40);

    mouldsight()
        .args(["--quiet", "compare"])
        .arg(&master)
        .arg(&part)
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_candidate_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);

    mouldsight()
        .arg("compare")
        .arg(&master)
        .arg(temp.path().join("nonexistent.png"))
        .assert()
        .code(66)
        .stderr(predicate::str::contains("candidate"));
}

#[test]
fn test_corrupt_reference_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("master.png");
    fs::write(&bogus, b"not a png at all").unwrap();
    let part = write_plate(temp.path(), "part.png", 0);

    mouldsight()
        .arg("compare")
        .arg(&bogus)
        .arg(&part)
        .assert()
        .code(66)
        .stderr(predicate::str::contains("reference"));
}

#[test]
fn test_invalid_config_returns_config_error() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{"ssim_window": 4}"#).unwrap();

    mouldsight()
        .args(["compare", "--config"])
        .arg(&config)
        .arg(&master)
        .arg(&master)
        .assert()
        .code(78)
        .stderr(predicate::str::contains("ssim_window"));
}

#[test]
fn test_missing_config_file_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);

    mouldsight()
        .args(["compare", "--config"])
        .arg(temp.path().join("missing.json"))
        .arg(&master)
        .arg(&master)
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_config_file_thresholds_apply() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let part = write_plate(temp.path(), "part.png", 40);
    let config = temp.path().join("lenient.json");
    fs::write(&config, r#"{"tiers": {"none_min": 90.0, "minor_min": 80.0, "moderate_min": 60.0}}"#)
        .unwrap();

    let output = mouldsight()
        .args(["--format", "json", "compare", "--config"])
        .arg(&config)
        .arg(&master)
        .arg(&part)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["severity"], "none");
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_batch_reports_each_part_in_order() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);
    let good = write_plate(temp.path(), "good.png", 0);
    let bad = write_plate(temp.path(), "bad.png", 40);

    let output = mouldsight()
        .args(["--format", "json", "batch", "--jobs", "2"])
        .arg(&master)
        .arg(&good)
        .arg(&bad)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(65));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]["candidate"].as_str().unwrap().ends_with("good.png"));
    assert_eq!(entries[0]["severity"], "none");
    assert!(entries[1]["candidate"].as_str().unwrap().ends_with("bad.png"));
    assert_eq!(entries[1]["defect_count"], 1);
}

#[test]
fn test_batch_missing_part_is_input_error() {
    let temp = TempDir::new().unwrap();
    let master = write_plate(temp.path(), "master.png", 0);

    mouldsight()
        .arg("batch")
        .arg(&master)
        .arg(&master)
        .arg(temp.path().join("missing.png"))
        .assert()
        .code(66)
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains("ERROR"));
}

#[test]
fn test_batch_requires_candidates() {
    mouldsight().args(["batch", "master.png"]).assert().failure();
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_catalog_lists_entries() {
    mouldsight()
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("short_shot"))
        .stdout(predicate::str::contains("flash"))
        .stdout(predicate::str::contains("sink_marks"));
}

#[test]
fn test_catalog_shows_entry_with_normalized_name() {
    mouldsight()
        .args(["catalog", "Short-Shot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Increase injection pressure"))
        .stdout(predicate::str::contains("Machine adjustments:"));
}

#[test]
fn test_catalog_unknown_entry_is_usage_error() {
    mouldsight()
        .args(["catalog", "gremlins"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("gremlins"));
}
