// crates/substrate-cli/tests/routes_command.rs
// ============================================================================
// Module: Routes Command Integration Tests
// Description: Runs the built `substrate routes` binary against a temp
//              SQLite store and config file.
// Purpose: Verify the operator-facing surface, not just the library helpers.
// Dependencies: substrate-cli binary, tempfile
// ============================================================================

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only setup and assertions are permitted.")]

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config_path = dir.path().join("substrate.toml");
    let db_path = dir.path().join("substrate.db");
    fs::write(
        &config_path,
        format!(
            "[deployment]\nenv = \"dev\"\n\n[sqlite]\npath = \"{}\"\n",
            db_path.display()
        ),
    )
    .expect("write config");
    config_path
}

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_substrate"))
}

#[test]
fn routes_set_then_list_shows_the_new_route() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(&dir);

    let set_status = binary()
        .args(["routes", "set", "--config"])
        .arg(&config_path)
        .args(["--resource-kind", "event_stream", "--tenant-id", "t_acme", "--env", "dev", "--backend-type", "sqlite", "--required"])
        .status()
        .expect("run routes set");
    assert!(set_status.success());

    let list_output = binary()
        .args(["routes", "list", "--config"])
        .arg(&config_path)
        .args(["--tenant-id", "t_acme"])
        .output()
        .expect("run routes list");
    assert!(list_output.status.success());
    let stdout = String::from_utf8_lossy(&list_output.stdout);
    assert!(stdout.contains("event_stream"));
    assert!(stdout.contains("sqlite"));
}

#[test]
fn routes_set_fails_closed_on_forbidden_backend_for_saas() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(&dir);

    let status = binary()
        .args(["routes", "set", "--config"])
        .arg(&config_path)
        .args(["--resource-kind", "object_store", "--tenant-id", "t_acme", "--env", "dev", "--mode", "saas", "--backend-type", "filesystem"])
        .status()
        .expect("run routes set");
    assert!(!status.success());
}

#[test]
fn routes_switch_fails_closed_when_no_route_exists() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(&dir);

    let status = binary()
        .args(["routes", "switch", "--config"])
        .arg(&config_path)
        .args(["--resource-kind", "event_stream", "--tenant-id", "t_acme", "--env", "dev", "--backend-type", "sqlite"])
        .status()
        .expect("run routes switch");
    assert!(!status.success());
}

#[test]
fn serve_exits_non_zero_when_no_routes_are_seeded() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = write_config(&dir);

    let output = binary().args(["serve", "--config"]).arg(&config_path).output().expect("run serve");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("resource_kind"));
}
