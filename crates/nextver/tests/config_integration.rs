//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. The effective
//! configuration is read back through `info --json`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("NEXTVER_LOG_DIR", std::env::temp_dir());
    cmd
}

/// The `config` section of `info --json` when run from `dir`.
fn effective_config(dir: &Path) -> serde_json::Value {
    let output = cmd()
        .arg("-C")
        .arg(dir)
        .args(["info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    json["config"].clone()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = effective_config(tmp.path());
    assert_eq!(config["tag_prefix"], "v");
    assert_eq!(config["initial_version"], "0.1.0");
    assert_eq!(config["time_zone"], "UTC");
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"tag_prefix = "rel-""#).unwrap();

    assert_eq!(effective_config(tmp.path())["tag_prefix"], "rel-");
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("nextver.toml"), r#"tag_prefix = "rel-""#).unwrap();

    assert_eq!(effective_config(tmp.path())["tag_prefix"], "rel-");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"initial_version = "1.0.0""#).unwrap();

    assert_eq!(effective_config(&sub_dir)["initial_version"], "1.0.0");
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"tag_prefix = "dot-""#).unwrap();
    fs::write(tmp.path().join("nextver.toml"), r#"tag_prefix = "plain-""#).unwrap();

    assert_eq!(effective_config(tmp.path())["tag_prefix"], "dot-");
}

#[test]
fn explicit_config_flag_is_loaded() {
    let tmp = TempDir::new().unwrap();
    let custom = tmp.path().join("release.yaml");
    fs::write(&custom, "tag_prefix: custom-\n").unwrap();

    let output = cmd()
        .arg("-C")
        .arg(tmp.path())
        .arg("--config")
        .arg(&custom)
        .args(["info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["config"]["tag_prefix"], "custom-");
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_toml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"
log_level = "warn"
allow_release_as = ["feat", "fix"]
"#,
    )
    .unwrap();

    let config = effective_config(tmp.path());
    assert_eq!(config["log_level"], "warn");
    assert_eq!(config["allow_release_as"], serde_json::json!(["feat", "fix"]));
}

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.yaml"),
        r"
time_zone: Europe/Berlin
commit_types:
  - type: feat
    section: Features
  - type: docs
    hidden: true
",
    )
    .unwrap();

    let config = effective_config(tmp.path());
    assert_eq!(config["time_zone"], "Europe/Berlin");
    assert_eq!(config["commit_types"], serde_json::json!(["feat", "docs"]));
}

#[test]
fn parses_yml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.yml"), "log_level: debug\n").unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "debug");
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.json"),
        r#"{"log_level": "error", "tag_prefix": ""}"#,
    )
    .unwrap();

    let config = effective_config(tmp.path());
    assert_eq!(config["log_level"], "error");
    assert_eq!(config["tag_prefix"], "");
}

#[test]
fn partial_bump_rule_keeps_other_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"
[bump.minor]
types = ["feat", "refactor"]
"#,
    )
    .unwrap();

    let output = cmd()
        .arg("-C")
        .arg(tmp.path())
        .args(["info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(
        json["strategy"]["minor"]["types"],
        serde_json::json!(["feat", "refactor"])
    );
    assert_eq!(
        json["strategy"]["patch"]["types"],
        serde_json::json!(["fix", "perf"])
    );
}

// =============================================================================
// Config Precedence
// =============================================================================

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"tag_prefix = "parent-""#).unwrap();
    fs::write(sub_dir.join(".nextver.toml"), r#"tag_prefix = "child-""#).unwrap();

    assert_eq!(effective_config(&sub_dir)["tag_prefix"], "child-");
}

#[test]
fn toml_preferred_over_yaml_in_same_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"tag_prefix = "toml-""#).unwrap();
    fs::write(tmp.path().join(".nextver.yaml"), "tag_prefix: yaml-\n").unwrap();

    assert_eq!(effective_config(tmp.path())["tag_prefix"], "toml-");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.toml"), "this is not valid toml [[[").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration").or(predicate::str::contains("config")));
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn invalid_breaking_policy_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"
[bump.major]
count_breaking_as = "sometimes"
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn invalid_commits_per_bump_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"
[bump.patch]
commits_per_bump = "lots"
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"
log_level = "info"
unknown_field = "should be ignored"
another_unknown = 42
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .success();
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();

    // Structure: parent/.nextver.toml + parent/repo/.git/ + parent/repo/src/
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(parent.join(".nextver.toml"), r#"tag_prefix = "outside-""#).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();

    assert_eq!(effective_config(&src)["tag_prefix"], "v");
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".nextver.toml"), r#"tag_prefix = "repo-""#).unwrap();

    assert_eq!(effective_config(&src)["tag_prefix"], "repo-");
}

// =============================================================================
// Config drives resolution
// =============================================================================

#[test]
fn allow_release_as_restricts_override() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".nextver.toml"),
        r#"allow_release_as = ["fix"]"#,
    )
    .unwrap();
    fs::write(
        tmp.path().join("commits.json"),
        r#"[{"hash": "c1", "message": "feat: cut\n\nRelease-As: 9.0.0"}]"#,
    )
    .unwrap();

    let output = cmd()
        .arg("-C")
        .arg(tmp.path())
        .args(["next", "--json", "--commits", "commits.json", "--previous", "1.0.0"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["version"], "1.1.0");
    assert_eq!(json["path"], "computed");
}

#[test]
fn tag_prefix_applies_to_reported_tag() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".nextver.toml"), r#"tag_prefix = "release/""#).unwrap();
    fs::write(
        tmp.path().join("commits.json"),
        r#"[{"hash": "c1", "message": "fix: a"}]"#,
    )
    .unwrap();

    let output = cmd()
        .arg("-C")
        .arg(tmp.path())
        .args(["next", "--json", "--commits", "commits.json", "--previous", "2.3.4"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["tag"], "release/2.3.5");
}
