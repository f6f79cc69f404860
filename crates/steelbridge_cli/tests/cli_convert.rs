use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture(name: &str) -> String {
    workspace_root()
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_steelbridge"))
        .args(args)
        .output()
        .expect("failed to run steelbridge CLI")
}

fn temp_output_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.json", std::process::id(), nanos))
}

#[test]
fn cli_converts_fixture_character() {
    let output_path = temp_output_path("steelbridge_cli_convert");
    let output = run_cli(&[
        &fixture("swami.ds-hero"),
        &output_path.to_string_lossy(),
        "--compendium",
        &fixture("compendium"),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("matched:      10"));
    assert!(stdout.contains("missing:      0"));

    let actor: Value = serde_json::from_slice(
        &std::fs::read(&output_path).expect("output file should exist"),
    )
    .expect("output should be valid JSON");
    assert_eq!(actor["name"], "Swami");
    assert_eq!(actor["type"], "hero");
    assert_eq!(actor["items"].as_array().map(Vec::len), Some(14));
    assert_eq!(actor["system"]["stamina"]["max"], 30);

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn cli_report_json_emits_structured_report() {
    let output_path = temp_output_path("steelbridge_cli_report");
    let output = run_cli(&[
        &fixture("swami.ds-hero"),
        &output_path.to_string_lossy(),
        "--compendium",
        &fixture("compendium"),
        "--report-json",
    ]);
    assert!(output.status.success());

    let report: Value =
        serde_json::from_slice(&output.stdout).expect("report should be valid JSON");
    assert_eq!(report["counts"]["matched"], 10);
    assert_eq!(report["counts"]["placeholder"], 2);
    assert_eq!(report["has_blocking_issues"], false);

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn cli_strict_mode_fails_on_unresolved_class() {
    let output_path = temp_output_path("steelbridge_cli_strict");
    let output = run_cli(&[
        &fixture("strict-hero.ds-hero"),
        &output_path.to_string_lossy(),
        "--compendium",
        &fixture("compendium"),
        "--strict",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MissingRequiredElement"));
    assert!(stderr.contains("Chronomancer"));
    assert!(!output_path.exists());

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn cli_without_strict_emits_placeholder_for_unresolved_class() {
    let output_path = temp_output_path("steelbridge_cli_lax");
    let output = run_cli(&[
        &fixture("strict-hero.ds-hero"),
        &output_path.to_string_lossy(),
        "--compendium",
        &fixture("compendium"),
    ]);
    assert!(output.status.success());

    let actor: Value = serde_json::from_slice(
        &std::fs::read(&output_path).expect("output file should exist"),
    )
    .expect("output should be valid JSON");
    let items = actor["items"].as_array().expect("items should be an array");
    let class_item = items
        .iter()
        .find(|item| item["type"] == "class")
        .expect("class placeholder should exist");
    assert_eq!(class_item["name"], "Chronomancer");
    assert_eq!(class_item["flags"]["steelbridge"]["placeholder"], true);

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn cli_fails_cleanly_on_missing_input() {
    let output_path = temp_output_path("steelbridge_cli_missing");
    let output = run_cli(&[
        "/nonexistent/hero.ds-hero",
        &output_path.to_string_lossy(),
        "--compendium",
        &fixture("compendium"),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}
