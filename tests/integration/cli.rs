//! CLI smoke tests driving the `skylift` binary against fixture feeds.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write_feed(dir: &Path) -> std::path::PathBuf {
    let feed = dir.join("releases.json");
    std::fs::write(
        &feed,
        r#"[
            {
                "tag_name": "v1.2.0",
                "prerelease": false,
                "name": "MyApp 1.2.0",
                "body": "<!-- au:lang=en -->English notes.<!-- au:end --><!-- au:lang=zh_Hans -->中文说明。<!-- au:end -->",
                "assets": [
                    {
                        "name": "myapp-1.2.0.zip",
                        "browser_download_url": "fixture://myapp-1.2.0.zip",
                        "content_type": "application/zip"
                    }
                ]
            },
            {
                "tag_name": "v1.0.0",
                "prerelease": false,
                "name": "MyApp 1.0.0",
                "body": "Initial release.",
                "assets": []
            }
        ]"#,
    )
    .unwrap();
    feed
}

fn skylift(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("skylift").unwrap();
    // Isolate from any real ~/.skylift/config.toml and disable bars.
    cmd.env("SKYLIFT_CONFIG", dir.join("no-config.toml"))
        .env("SKYLIFT_NO_PROGRESS", "1");
    cmd
}

#[test]
fn check_stages_an_update_from_the_fixture_feed() {
    let dir = TempDir::new().unwrap();
    let feed = write_feed(dir.path());

    skylift(dir.path())
        .arg("--fixture")
        .arg(&feed)
        .args(["--prefix", "myapp"])
        .args(["--skip-signing", "--running-version", "1.0.0", "--quiet"])
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.0"))
        .stdout(predicate::str::contains("downloaded and validated"));
}

#[test]
fn check_reports_up_to_date() {
    let dir = TempDir::new().unwrap();
    let feed = write_feed(dir.path());

    skylift(dir.path())
        .arg("--fixture")
        .arg(&feed)
        .args(["--prefix", "myapp"])
        .args(["--skip-signing", "--running-version", "1.2.0", "--quiet"])
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date"));
}

#[test]
fn changelog_resolves_the_preferred_language() {
    let dir = TempDir::new().unwrap();
    let feed = write_feed(dir.path());

    skylift(dir.path())
        .arg("--fixture")
        .arg(&feed)
        .args(["--prefix", "myapp"])
        .args([
            "--running-version",
            "1.0.0",
            "--langs",
            "zh-CN,en",
            "--quiet",
        ])
        .arg("changelog")
        .assert()
        .success()
        .stdout(predicate::str::contains("中文说明。"));
}

#[test]
fn changelog_falls_back_to_the_newest_release_when_current() {
    let dir = TempDir::new().unwrap();
    let feed = write_feed(dir.path());

    skylift(dir.path())
        .arg("--fixture")
        .arg(&feed)
        .args(["--prefix", "myapp"])
        .args(["--running-version", "1.2.0", "--langs", "en", "--quiet"])
        .arg("changelog")
        .assert()
        .success()
        .stdout(predicate::str::contains("English notes."));
}

#[test]
fn update_dry_run_does_not_install() {
    let dir = TempDir::new().unwrap();
    let feed = write_feed(dir.path());

    skylift(dir.path())
        .arg("--fixture")
        .arg(&feed)
        .args(["--prefix", "myapp"])
        .args([
            "--skip-signing",
            "--running-version",
            "1.0.0",
            "--quiet",
        ])
        .args(["update", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run"));
}

#[test]
fn missing_feed_configuration_is_an_error() {
    let dir = TempDir::new().unwrap();

    skylift(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no release feed configured"));
}

#[test]
fn no_subcommand_prints_usage() {
    let dir = TempDir::new().unwrap();

    skylift(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
