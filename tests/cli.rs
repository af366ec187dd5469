//! Tests for the `sahayaka` operator commands, driven through the real
//! binary the way a deployment would run them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn sahayaka_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("sahayaka");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::write(
        root.join("schemes_data.json"),
        r#"{"schemes": [{"name": "PM-KISAN"}]}"#,
    )
    .unwrap();
    fs::write(
        root.join("enriched_soil.csv"),
        "rtc_number,soil_ph,village\n123/ABC-45,6.5,Hosur\n77-X/2,7.1,Mandya\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[data]
schemes_path = "{root}/schemes_data.json"
farmer_csv_path = "{root}/enriched_soil.csv"
static_dir = "{root}/static"
"#,
        root = root.display()
    );
    let config_path = root.join("portal.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_sahayaka(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = sahayaka_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("GEMINI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run sahayaka binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn check_reports_loaded_components() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sahayaka(&config_path, &["check"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("schemes"));
    assert!(stdout.contains("ok (2 rows)"));
    assert!(stdout.contains("not configured"));
}

#[test]
fn check_reports_missing_data_file() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("enriched_soil.csv")).unwrap();

    // A broken data file degrades the component; check itself still succeeds.
    let (stdout, _, success) = run_sahayaka(&config_path, &["check"]);
    assert!(success);
    assert!(stdout.contains("failed"));
}

#[test]
fn lookup_prints_record_as_json() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sahayaka(&config_path, &["lookup", "123abc45"]);
    assert!(success, "lookup failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("\"rtc_number\": \"123/ABC-45\""));
    assert!(stdout.contains("\"soil_ph\": 6.5"));
    assert!(!stdout.contains("cleaned_rtc"));
}

#[test]
fn lookup_unknown_rtc_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_sahayaka(&config_path, &["lookup", "999zzz"]);
    assert!(!success);
    assert!(stderr.contains("no matching record"));
}
