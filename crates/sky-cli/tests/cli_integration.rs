//! CLI integration tests
//!
//! Exercises the skyhook binary surface with assert_cmd. These tests avoid
//! anything that needs a real cloudflared binary; read-only commands work
//! against a scratch data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn skyhook() -> Command {
    Command::cargo_bin("skyhook")
        .expect("failed to locate skyhook binary - ensure it's built before running tests")
}

/// Write a config pointing all paths into a scratch directory
fn scratch_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let content = format!(
        r#"
default_domain = "example.com"
managed_tunnel_name = "skyhook"
base_port = 4000
data_dir = "{data}"
credentials_dir = "{data}/creds"
cloudflared_binary = "cloudflared"
"#,
        data = dir.path().join("data").display()
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn help_names_the_tool() {
    skyhook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("skyhook"))
        .stdout(predicate::str::contains("Publish local servers"));
}

#[test]
fn version_prints() {
    skyhook()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("skyhook"));
}

#[test]
fn start_help_mentions_dedicated_flag() {
    skyhook()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dedicated"));
}

#[test]
fn unknown_command_fails() {
    skyhook()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn list_on_empty_state_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No servers running"));
}

#[test]
fn list_json_on_empty_state_is_an_empty_array() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "--json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn status_on_empty_state_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tunnels"));
}

#[test]
fn stop_unknown_name_fails_not_found() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "stop", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server found"));
}

#[test]
fn logs_unknown_name_fails_not_found() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "logs", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server found"));
}

#[test]
fn config_show_round_trips_the_file() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);

    skyhook()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_domain = \"example.com\""));
}

#[test]
fn config_path_prints_a_path() {
    skyhook()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn corrupt_state_is_fatal_and_tells_the_user() {
    let dir = TempDir::new().unwrap();
    let config = scratch_config(&dir);
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("state.json"), "{ not json").unwrap();

    skyhook()
        .args(["--config", config.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));
}
