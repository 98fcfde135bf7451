//! `facectl` subprocess tests. None of these reach a live service.

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn base_cmd(temp_home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("facectl"));
    cmd.env("HOME", temp_home);
    cmd.env("XDG_CONFIG_HOME", temp_home.join(".config"));
    cmd.env_remove("FACE_CONSOLE_API_URL");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    base_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("faces").and(contains("labels")).and(contains("retrain")));
}

#[test]
fn unknown_preset_is_rejected() {
    let home = TempDir::new().unwrap();
    base_cmd(home.path())
        .args(["faces", "--preset", "next-week"])
        .assert()
        .failure()
        .stderr(contains("next-week"));
}

#[test]
fn non_http_api_url_fails_validation() {
    let home = TempDir::new().unwrap();
    base_cmd(home.path())
        .args(["--api-url", "ftp://faces.local/api/", "retrain"])
        .assert()
        .failure()
        .stderr(contains("http or https"));
}

#[test]
fn invalid_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".config").join("face-console");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "page_limit = 0\n").unwrap();

    base_cmd(home.path())
        .args(["labels", "list"])
        .assert()
        .failure()
        .stderr(contains("page_limit must be at least 1"));
}

#[test]
fn explicit_config_path_is_used() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    fs::write(&path, "api_url = \"gopher://x/\"\n").unwrap();

    base_cmd(home.path())
        .arg("--config")
        .arg(&path)
        .args(["labels", "list"])
        .assert()
        .failure()
        .stderr(contains("gopher").or(contains("http or https")));
}

#[test]
fn unreachable_service_fails_cleanly() {
    let home = TempDir::new().unwrap();
    base_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9/api/", "labels", "list"])
        .assert()
        .failure()
        .stderr(contains("loading labels"));
}
