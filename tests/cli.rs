use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

fn webnav(dir: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("webnav");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir)
        .env("WEBNAV_API_STORE", dir.join("apis.json"))
        .arg("--config")
        .arg(dir.join("config.yaml"));
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn offline_generate_prints_model_output() {
    let dir = tempfile::tempdir().unwrap();
    let assert = webnav(dir.path())
        .args(["--output", "json", "generate", "--offline", "parse", "a", "csv"])
        .assert()
        .success();

    let value = stdout_json(assert.get_output());
    assert_eq!(value["task"].as_str(), Some("parse a csv"));
    assert_eq!(value["code"].as_str(), Some("[]"));
}

#[test]
fn recent_apis_on_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let assert = webnav(dir.path())
        .args(["--output", "json", "apis", "recent", "--limit", "3"])
        .assert()
        .success();

    assert_eq!(stdout_json(assert.get_output()), Value::Array(Vec::new()));
}

#[test]
fn schema_without_captures_says_so() {
    let dir = tempfile::tempdir().unwrap();
    let assert = webnav(dir.path())
        .args(["--output", "json", "apis", "schema", "--offline"])
        .assert()
        .success();

    let value = stdout_json(assert.get_output());
    assert_eq!(value["rows"].as_u64(), Some(0));
    assert_eq!(
        value["schema"].as_str(),
        Some(api_capture::NO_SCHEMA_INPUT)
    );
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    webnav(dir.path())
        .args(["config", "set", "model.coding_model", "qwen2.5-coder"])
        .assert()
        .success();
    assert!(dir.path().join("config.yaml").exists());

    let assert = webnav(dir.path())
        .args(["config", "get", "model.coding_model"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.trim(), "qwen2.5-coder");
}

#[test]
fn unknown_config_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    webnav(dir.path())
        .args(["config", "get", "model.nope"])
        .assert()
        .failure();
}

#[test]
fn analyze_rejects_non_web_urls() {
    let dir = tempfile::tempdir().unwrap();
    webnav(dir.path())
        .args(["analyze", "--offline", "ftp://example.com"])
        .assert()
        .failure();
}
