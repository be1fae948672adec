//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `herald` binary and verify exit codes,
//! stdout content, and stderr content. Campaign and config files are
//! written into a temp dir per test.

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn herald() -> Command {
    let mut cmd = cargo_bin_cmd!("herald");
    cmd.env_remove("HERALD_LOG");
    cmd.env_remove("HERALD_JIT_AUTH_TOKEN");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const CAMPAIGNS: &str = r#"{
  "capping": {"session": 5},
  "campaigns": [
    {"id": "welcome", "priority": 1, "triggers": [{"type": "next_session"}]},
    {"id": "home-banner", "priority": 10, "triggers": [{"type": "event", "name": "OPEN", "label": "home"}],
     "payload": {"title": "Hello"}},
    {"id": "any-open", "priority": 5, "triggers": [{"type": "event", "name": "OPEN"}], "maxViews": 1},
    {"id": "pro-users", "priority": 20,
     "triggers": [{"type": "condition", "rule": "(= `c.plan` \"pro\")"}]}
  ]
}"#;

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    herald()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Herald campaign targeting tools"));
}

#[test]
fn version_exits_0() {
    herald()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("herald"));
}

// ──────────────────────────────────────────────
// 2. parse
// ──────────────────────────────────────────────

#[test]
fn parse_prints_tree() {
    herald()
        .args(["parse", "(and  true (= `c.plan`   \"pro\"))"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(and true (= `c.plan` \"pro\"))"));
}

#[test]
fn parse_error_exits_1() {
    herald()
        .args(["parse", "(= 1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn parse_error_json_is_structured() {
    let out = herald()
        .args(["--output", "json", "parse", "true"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(json["error"].as_str().unwrap().contains("parse error"));
}

// ──────────────────────────────────────────────
// 3. eval
// ──────────────────────────────────────────────

#[test]
fn eval_without_vars() {
    herald()
        .args(["eval", "(if true 2 1)"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn eval_with_vars_file() {
    let dir = TempDir::new().unwrap();
    let vars = write(
        &dir,
        "vars.json",
        r#"{"c.age": 30, "t.segments": ["vip", "beta"], "c.profile": {"nested": true}}"#,
    );
    herald()
        .args(["--output", "json", "eval"])
        .arg("(and (>= `c.age` 18) (contains \"vip\" `t.segments`))")
        .arg("--vars")
        .arg(&vars)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""result":true"#));
}

#[test]
fn eval_type_error_exits_1() {
    herald()
        .args(["eval", "(if 2 true)"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("eval error"));
}

#[test]
fn eval_missing_vars_file_exits_1() {
    herald()
        .args(["eval", "(= 1 1)", "--vars", "/nonexistent/vars.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vars file not found"));
}

#[test]
fn quiet_suppresses_errors() {
    herald()
        .args(["--quiet", "eval", "(not 1)"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 4. select
// ──────────────────────────────────────────────

#[test]
fn select_event_picks_highest_priority() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    herald()
        .args(["select", "--signal", "event", "--event", "OPEN", "--label", "home"])
        .arg("--campaigns")
        .arg(&campaigns)
        .assert()
        .success()
        .stdout(predicate::str::contains("selected: home-banner"))
        .stdout(predicate::str::contains("eligible: home-banner, any-open"));
}

#[test]
fn select_json_includes_payload() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    let out = herald()
        .args(["--output", "json", "select", "--signal", "event", "--event", "OPEN", "--label", "home"])
        .arg("--campaigns")
        .arg(&campaigns)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["signal"], "event");
    assert_eq!(json["selected"], "home-banner");
    assert_eq!(json["payload"]["title"], "Hello");
}

#[test]
fn select_new_session() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    herald()
        .args(["select", "--signal", "new-session"])
        .arg("--campaigns")
        .arg(&campaigns)
        .assert()
        .success()
        .stdout(predicate::str::contains("selected: welcome"));
}

#[test]
fn select_attribute_change_uses_user_file() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    let user = write(
        &dir,
        "user.json",
        r#"{"attributes": {"plan": {"kind": "string", "raw": "pro"}}}"#,
    );
    herald()
        .args(["select", "--signal", "attribute-changed"])
        .arg("--campaigns")
        .arg(&campaigns)
        .arg("--user")
        .arg(&user)
        .assert()
        .success()
        .stdout(predicate::str::contains("selected: pro-users"));
}

#[test]
fn select_records_views_in_configured_store() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    let state = dir.path().join("state.json");
    let config = write(
        &dir,
        "herald.toml",
        &format!("store_path = {:?}\n", state.display().to_string()),
    );

    let select = || {
        let mut cmd = herald();
        cmd.args(["select", "--signal", "event", "--event", "OPEN", "--record"])
            .arg("--campaigns")
            .arg(&campaigns)
            .arg("--config")
            .arg(&config);
        cmd
    };

    select()
        .assert()
        .success()
        .stdout(predicate::str::contains("selected: any-open"))
        .stdout(predicate::str::contains("views: 1"));
    assert!(state.exists());

    // maxViews = 1 is now exhausted.
    select()
        .assert()
        .success()
        .stdout(predicate::str::contains("no campaign selected"));
}

#[test]
fn select_event_requires_name() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    herald()
        .args(["select", "--signal", "event"])
        .arg("--campaigns")
        .arg(&campaigns)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--event is required"));
}

#[test]
fn select_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let campaigns = write(&dir, "campaigns.json", CAMPAIGNS);
    let config = write(&dir, "herald.toml", "utc_offset = \"later\"\n");
    herald()
        .args(["select", "--signal", "new-session"])
        .arg("--campaigns")
        .arg(&campaigns)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn select_missing_campaigns_file() {
    herald()
        .args(["select", "--signal", "new-session", "--campaigns", "/nonexistent/c.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("campaigns file not found"));
}
