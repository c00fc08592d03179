//! CLI integration tests using assert_cmd
//!
//! These tests verify the CLI commands work correctly end-to-end against a
//! temporary data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the navtabs binary, bound to `data_dir`
fn navtabs_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("navtabs").expect("Failed to find navtabs binary");
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

fn write_json(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write input file");
    path
}

fn seed_legacy_tabs(data_dir: &Path) {
    let input = write_json(
        data_dir,
        "legacy.json",
        r#"[{"label": "Accounts", "url": "/lightning/o/Account/list"},
            {"label": "Reports", "url": "/lightning/o/Report/home",
             "children": [{"label": "Mine", "url": "/lightning/o/Report/mine"}]}]"#,
    );
    navtabs_cmd(data_dir)
        .args(["record", "save", "customTabs", "--file"])
        .arg(&input)
        .assert()
        .success();
}

#[test]
fn test_help_command() {
    Command::cargo_bin("navtabs")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "navtabs - navigation tab storage and migration tool",
        ));
}

#[test]
fn test_version_command() {
    Command::cargo_bin("navtabs")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("navtabs"));
}

#[test]
fn test_record_save_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let input = write_json(temp.path(), "in.json", r#"{"theme": "dark"}"#);

    navtabs_cmd(temp.path())
        .args(["record", "save", "prefs", "--area", "local", "--file"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 'prefs' to local storage"));

    navtabs_cmd(temp.path())
        .args(["record", "load", "prefs", "--area", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"theme\": \"dark\""));

    assert!(temp.path().join("local.json").exists());
}

#[test]
fn test_record_save_from_stdin() {
    let temp = TempDir::new().unwrap();

    navtabs_cmd(temp.path())
        .args(["record", "save", "numbers"])
        .write_stdin("[1, 2, 3]")
        .assert()
        .success();

    navtabs_cmd(temp.path())
        .args(["record", "inspect", "numbers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: direct"));
}

#[test]
fn test_large_record_is_chunked() {
    let temp = TempDir::new().unwrap();
    let body = format!("{{\"notes\": \"{}\"}}", "n".repeat(20_000));
    let input = write_json(temp.path(), "big.json", &body);

    navtabs_cmd(temp.path())
        .args(["record", "save", "notes", "--file"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("in 3 chunks"));

    navtabs_cmd(temp.path())
        .args(["record", "inspect", "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: chunked"))
        .stdout(predicate::str::contains("Chunks: 3"));

    navtabs_cmd(temp.path())
        .args(["record", "clear", "notes"])
        .assert()
        .success();

    navtabs_cmd(temp.path())
        .args(["record", "inspect", "notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: absent"));
}

#[test]
fn test_usage_reports_both_areas() {
    let temp = TempDir::new().unwrap();

    navtabs_cmd(temp.path())
        .args(["record", "save", "k"])
        .write_stdin("\"ab\"")
        .assert()
        .success();

    navtabs_cmd(temp.path())
        .args(["record", "usage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("synced:"))
        .stdout(predicate::str::contains("of 102400 bytes"))
        .stdout(predicate::str::contains("local: 0 of 10485760 bytes"));
}

#[test]
fn test_invalid_json_input_fails() {
    let temp = TempDir::new().unwrap();
    let input = write_json(temp.path(), "bad.json", "{not json");

    navtabs_cmd(temp.path())
        .args(["record", "save", "bad", "--file"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input is not valid JSON"));
}

#[test]
fn test_unknown_area_is_rejected() {
    let temp = TempDir::new().unwrap();

    navtabs_cmd(temp.path())
        .args(["record", "load", "x", "--area", "session"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown storage area"));
}

#[test]
fn test_migration_flow() {
    let temp = TempDir::new().unwrap();
    seed_legacy_tabs(temp.path());

    navtabs_cmd(temp.path())
        .args(["migrate", "detect", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration for 1.4.0: needed"))
        .stdout(predicate::str::contains("Pending: true"));

    navtabs_cmd(temp.path())
        .args(["migrate", "perform", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated 2 tabs"));

    navtabs_cmd(temp.path())
        .args(["migrate", "detect", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not needed"))
        .stdout(predicate::str::contains("Completed: 1.4.0"));

    navtabs_cmd(temp.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default (default)"));

    navtabs_cmd(temp.path())
        .args(["tabs", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accounts -> /lightning/o/Account/list"))
        .stdout(predicate::str::contains("Mine -> /lightning/o/Report/mine"));
}

#[test]
fn test_migration_skip_and_reset() {
    let temp = TempDir::new().unwrap();
    seed_legacy_tabs(temp.path());

    navtabs_cmd(temp.path())
        .args(["migrate", "skip", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped migration for 1.4.0"));

    navtabs_cmd(temp.path())
        .args(["migrate", "detect", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed: skipped"));

    navtabs_cmd(temp.path())
        .args(["migrate", "reset"])
        .assert()
        .success();

    navtabs_cmd(temp.path())
        .args(["migrate", "detect", "--version", "1.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration for 1.4.0: needed"));
}

#[test]
fn test_profile_commands() {
    let temp = TempDir::new().unwrap();

    navtabs_cmd(temp.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles found."));

    navtabs_cmd(temp.path())
        .args(["profile", "create", "Work", "--pattern", "https://work.example.com/*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created profile: Work"));

    navtabs_cmd(temp.path())
        .args(["profile", "match", "https://work.example.com/home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Work"));

    navtabs_cmd(temp.path())
        .args(["profile", "create", "work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    navtabs_cmd(temp.path())
        .args(["profile", "switch", "no-such-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile not found"));

    navtabs_cmd(temp.path())
        .args(["profile", "storage", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local storage"));

    navtabs_cmd(temp.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profiles (local storage)"));
}

#[test]
fn test_config_file_is_used() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("navtabs.toml"),
        "chunk_size_threshold = 10\n",
    )
    .unwrap();
    let input = write_json(temp.path(), "in.json", r#""twenty-five characters!""#);

    navtabs_cmd(temp.path())
        .args(["record", "save", "short", "--file"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("in 3 chunks"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("navtabs.toml"), "max_chunk_count = 0\n").unwrap();

    navtabs_cmd(temp.path())
        .args(["tabs", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
