//! Integration tests for the `unicast` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! config file handling and discovery of configured entities. No network
//! discovery transport is involved.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `unicast` binary with env isolation.
///
/// Clears `UNICAST_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn unicast_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("unicast");
    cmd.env("HOME", "/tmp/unicast-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/unicast-cli-test-nonexistent")
        .env_remove("UNICAST_CONFIG")
        .env_remove("UNICAST_OUTPUT")
        .env_remove("UNICAST_NAME")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const SAMPLE: &str = r#"
name = "den"

[[receivers]]
name = "Living Room"
address = "192.168.1.20"

[[providers]]
name = "Den"
address = "192.168.1.50"
port = 8080
"#;

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = unicast_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    unicast_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("receivers")
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    unicast_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unicast"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    unicast_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    unicast_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Packaging artifacts ─────────────────────────────────────────────

#[test]
fn test_build_renders_man_pages_and_completions() {
    let out_dir = Path::new(env!("OUT_DIR"));

    for page in ["unicast.1", "unicast-discover.1", "unicast-config-show.1"] {
        let text = std::fs::read_to_string(out_dir.join("man").join(page)).unwrap();
        assert!(text.contains(".TH"), "{page} is not a man page");
    }
    for script in ["unicast.bash", "_unicast", "unicast.fish"] {
        assert!(
            out_dir.join("completions").join(script).is_file(),
            "missing completion script {script}"
        );
    }
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = unicast_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = unicast_cmd()
        .args(["--output", "yaml", "discover"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(&path).unwrap().contains("Living Room"));

    let output = unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("already exists"));

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_renders_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["-o", "json-compact", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""name":"den""#)
                .and(predicate::str::contains("Living Room")),
        );
}

#[test]
fn test_config_show_without_file_uses_defaults() {
    unicast_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"name = "unicast""#));
}

// ── Discover ────────────────────────────────────────────────────────

#[test]
fn test_discover_lists_configured_entities() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["-o", "plain", "discover", "--timeout", "5"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Living Room\nDen\n"));
}

#[test]
fn test_discover_json_reports_roles() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    unicast_cmd()
        .arg("--config")
        .arg(&path)
        .args(["-o", "json", "discover", "--no-scan"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""role": "receiver""#)
                .and(predicate::str::contains(r#""role": "provider""#))
                .and(predicate::str::contains(r#""address": "192.168.1.20""#)),
        );
}

#[test]
fn test_discover_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[receivers]]
name = "TV"
address = "192.168.1.20"

[[receivers]]
name = "TV"
address = "192.168.1.21"
"#,
    );

    let output = unicast_cmd()
        .arg("--config")
        .arg(&path)
        .arg("discover")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("duplicate receiver name"));
}
