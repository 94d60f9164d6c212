use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const FIXTURE: &str = include_str!("../../question-host/tests/fixtures/check_retry.json");

fn compose() -> Command {
    Command::new(env!("CARGO_BIN_EXE_question-compose"))
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn run_prints_text_report() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let script = write(workspace.path(), "script.json", FIXTURE);

    let output = compose().arg("run").arg("--script").arg(&script).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("div.h5p-question.h5p-multichoice"));
    assert!(stdout.contains("Button check: detached"));
    assert!(stdout.contains("Button retry: visible"));
    assert!(stdout.contains("Clicks: check"));
    Ok(())
}

#[test]
fn run_prints_json_report_with_config() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TempDir::new()?;
    let script = write(workspace.path(), "script.json", FIXTURE);
    let config = write(
        workspace.path(),
        "config.json",
        r#"{"class_prefix": "quiz", "transition_ms": 40}"#,
    );

    let output = compose()
        .args(["run", "--format", "json", "--script"])
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .output()?;
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["tree"]["classes"][0], "quiz");
    assert_eq!(report["feedback"], "visible");
    assert_eq!(report["elapsed_ms"], 40);
    Ok(())
}

#[test]
fn run_fails_on_unknown_button() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TempDir::new()?;
    let script = write(
        workspace.path(),
        "script.json",
        r#"{"steps": [{"op": "click_button", "id": "missing"}]}"#,
    );

    let output = compose().args(["run", "--script"]).arg(&script).output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("UnknownButton"));
    Ok(())
}

#[test]
fn schema_lists_config_fields() -> Result<(), Box<dyn std::error::Error>> {
    let output = compose().arg("schema").output()?;
    assert!(output.status.success());

    let schema: Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema["properties"]["class_prefix"].is_object());
    Ok(())
}

#[test]
fn check_config_accepts_valid_and_rejects_duplicates() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TempDir::new()?;
    let good = write(
        workspace.path(),
        "good.json",
        r#"{"order": ["content", "buttons"], "base_path": "/h5p"}"#,
    );
    let bad = write(
        workspace.path(),
        "bad.json",
        r#"{"order": ["content", "content"]}"#,
    );

    let output = compose()
        .args(["check-config", "--config"])
        .arg(&good)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Order: content, buttons"));
    assert!(stdout.contains("Base path: /h5p"));

    compose()
        .args(["check-config", "--config"])
        .arg(&bad)
        .assert()
        .failure();
    Ok(())
}
