use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

const PAGE: &str = r#"
elements:
  - id: submit
    tag: button
  - id: name
    tag: input
    value: "Jane Doe"
pendingRequestsMs: 20
"#;

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.display().to_string()
}

fn driver() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("action-driver"));
    cmd.env("ACTION_DRIVER_CHECK_DELAY_MS", "20");
    cmd
}

#[test]
fn run_reports_success_status() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.yaml", PAGE);
    let command = write(
        dir.path(),
        "command.json",
        r##"{ "type": "select-text", "selector": "#name", "startPos": 5 }"##,
    );

    let assert = driver()
        .args(["run", "--page", &page, "--command", &command, "--events"])
        .assert()
        .success();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(payload["status"]["isCommandResult"], true);
    assert!(payload["status"].get("executionError").is_none());

    let automations: Vec<&str> = payload["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|event| event["event"] == "automation")
        .filter_map(|event| event["description"].as_str())
        .collect();
    assert_eq!(automations, vec!["select #name 5..8"]);
}

#[test]
fn run_exits_nonzero_with_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "page.yaml", PAGE);
    let command = write(
        dir.path(),
        "command.json",
        r##"{ "type": "drag-to-element", "selector": "#submit", "destinationSelector": "#trash" }"##,
    );

    let assert = driver()
        .args([
            "run",
            "--page",
            &page,
            "--command",
            &command,
            "--budget-ms",
            "100",
        ])
        .assert()
        .failure();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let error = &payload["status"]["executionError"];
    assert_eq!(error["code"], "E_ACTION_ADDITIONAL_ELEMENT_NOT_FOUND");
    assert_eq!(error["argumentName"], "destinationSelector");
}

#[test]
fn validate_lists_required_selectors() {
    let dir = tempfile::tempdir().unwrap();
    let command = write(
        dir.path(),
        "command.json",
        r##"{ "type": "select-editable-content", "startSelector": "#p1" }"##,
    );

    let assert = driver()
        .args(["validate", "--command", &command])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.starts_with("select-editable-content"));
    assert!(stdout.contains("\"startSelector\""));
    assert!(stdout.contains("\"endSelector\""));
}
