#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BASE_URL: &str = "https://files.example.com/";

/// US Eastern time as a POSIX rule, so no zone database is needed.
const US_EASTERN: &str = "EST5EDT,M3.2.0,M11.1.0";

/// A sandboxed HOME with local storage and catalog backends.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("home")).unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Write a config file pointing every backend into the sandbox.
    fn config_file(&self) -> PathBuf {
        let contents = format!(
            r#"
[storage]
type = "filesystem"
path = "{objects}"

[catalog]
type = "sqlite"
path = "{catalog}"

[share]
serve_base_url = "{BASE_URL}"
"#,
            objects = self.path("objects").display(),
            catalog = self.path("catalog.db").display(),
        );
        self.write("config.toml", &contents)
    }

    fn command(&self, bin: &str) -> Command {
        let mut cmd = Command::cargo_bin(bin).unwrap();
        cmd.env("HOME", self.path("home"))
            .env("XDG_CONFIG_HOME", self.path("xdg"))
            .env("TZ", "UTC")
            .env_remove("RUST_LOG")
            .env_remove("S3SHARE_CONFIG");
        cmd
    }

    /// `s3share` configured entirely through environment variables.
    fn s3share_env(&self) -> Command {
        let mut cmd = self.command("s3share");
        cmd.env("S3SHARE_STORAGE__TYPE", "filesystem")
            .env("S3SHARE_STORAGE__PATH", self.path("objects"))
            .env("S3SHARE_CATALOG__TYPE", "sqlite")
            .env("S3SHARE_CATALOG__PATH", self.path("catalog.db"))
            .env("S3SHARE_SHARE__SERVE_BASE_URL", BASE_URL);
        cmd
    }

    fn state_json(&self) -> String {
        fs::read_to_string(self.path("home").join(".s3share")).unwrap()
    }
}

fn stdout_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .command("s3share")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(contains("Usage"));
}

#[test]
fn missing_configuration_is_an_error() {
    let sandbox = Sandbox::new();
    sandbox
        .command("s3share")
        .arg("--list")
        .assert()
        .failure()
        .stderr(contains("No configuration provided"));
}

#[test]
fn upload_prints_urls_in_input_order_then_lists() {
    let sandbox = Sandbox::new();
    let first = sandbox.write("src/hello world.txt", "hello");
    let second = sandbox.write("src/b.txt", "b");

    let output = sandbox
        .s3share_env()
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        stdout_lines(&output),
        vec![
            "https://files.example.com/hello%20world.txt",
            "https://files.example.com/b.txt",
        ]
    );
    assert!(exists(&sandbox.path("objects/hello world.txt")));
    assert!(exists(&sandbox.path("objects/b.txt")));
    assert!(sandbox.state_json().contains("\"last_fetched_index\": 2"));

    let output = sandbox
        .s3share_env()
        .arg("-l")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(": https://files.example.com/hello%20world.txt"));
    assert!(lines[1].ends_with(": https://files.example.com/b.txt"));
}

#[test]
fn upload_and_list_in_one_invocation() {
    let sandbox = Sandbox::new();
    let config = sandbox.config_file();
    let file = sandbox.write("src/report.pdf", "%PDF");

    let output = sandbox
        .command("s3share")
        .arg("--config")
        .arg(&config)
        .arg("-l")
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "https://files.example.com/report.pdf");
    assert!(lines[1].ends_with(": https://files.example.com/report.pdf"));
}

#[test]
fn upload_of_missing_file_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .s3share_env()
        .arg(sandbox.path("src/nope.txt"))
        .assert()
        .failure()
        .stderr(contains("nope.txt"));
}

#[test]
fn import_dry_run_prints_plan_without_config() {
    let sandbox = Sandbox::new();
    sandbox
        .command("s3share-import")
        .arg("--dry-run")
        .write_stdin("2021-01-02 10:00:00 5 b.txt\n2021-01-01 09:00:00 3 a.txt\n")
        .assert()
        .success()
        .stdout("1. 1609491600: \"a.txt\"\n2. 1609581600: \"b.txt\"\n");
}

#[test]
fn import_rejects_malformed_listing() {
    let sandbox = Sandbox::new();
    sandbox
        .command("s3share-import")
        .arg("--dry-run")
        .write_stdin("2021-01-01 09:00:00 3 a.txt\nnot a listing line\n")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("line 2"));
}

#[test]
fn import_then_list_shows_seeded_catalog() {
    let sandbox = Sandbox::new();
    let config = sandbox.config_file();
    let listing = sandbox.write(
        "listing.txt",
        "2021-01-02 10:00:00        5 b.txt\n2021-01-01 09:00:00        3 a.txt\n",
    );

    sandbox
        .command("s3share-import")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&listing)
        .assert()
        .success();

    sandbox
        .command("s3share")
        .arg("--config")
        .arg(&config)
        .arg("--list")
        .assert()
        .success()
        .stdout(
            "2021-01-01 09:00:00: https://files.example.com/a.txt\n\
             2021-01-02 10:00:00: https://files.example.com/b.txt\n",
        );

    // The next upload continues after the imported rows.
    let file = sandbox.write("src/c.txt", "c");
    sandbox
        .command("s3share")
        .arg("--config")
        .arg(&config)
        .arg(&file)
        .assert()
        .success();
    assert!(sandbox.state_json().contains("\"last_fetched_index\": 3"));
}

#[test]
fn listing_times_use_the_offset_of_their_own_date() {
    let sandbox = Sandbox::new();
    let config = sandbox.config_file();
    let listing = "2021-01-01 09:00:00 3 jan.txt\n2021-07-01 09:00:00 3 jul.txt\n";

    sandbox
        .command("s3share-import")
        .env("TZ", US_EASTERN)
        .arg("--dry-run")
        .write_stdin(listing)
        .assert()
        .success()
        .stdout("1. 1609509600: \"jan.txt\"\n2. 1625144400: \"jul.txt\"\n");

    sandbox
        .command("s3share-import")
        .env("TZ", US_EASTERN)
        .arg("--config")
        .arg(&config)
        .write_stdin(listing)
        .assert()
        .success();

    sandbox
        .command("s3share")
        .env("TZ", US_EASTERN)
        .arg("--config")
        .arg(&config)
        .arg("-l")
        .assert()
        .success()
        .stdout(
            "2021-01-01 09:00:00: https://files.example.com/jan.txt\n\
             2021-07-01 09:00:00: https://files.example.com/jul.txt\n",
        );
}

#[test]
fn verbose_run_reports_backend_health() {
    let sandbox = Sandbox::new();
    let file = sandbox.write("src/a.txt", "a");

    sandbox
        .s3share_env()
        .arg("-v")
        .arg(&file)
        .assert()
        .success()
        .stderr(contains("storage reachable").and(contains("catalog reachable")));

    sandbox
        .s3share_env()
        .arg("-l")
        .assert()
        .success()
        .stderr(contains("reachable").not());
}
