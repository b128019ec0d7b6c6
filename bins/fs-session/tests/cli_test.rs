//! CLI surface tests
//!
//! These run the compiled binary against a temporary session directory;
//! nothing here talks to the network.

use assert_cmd::Command;
use predicates::prelude::*;

fn fs_session() -> Command {
    Command::cargo_bin("fs-session").unwrap()
}

#[test]
fn help_lists_subcommands() {
    fs_session()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("sign-in"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("sign-out"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn status_reports_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();

    fs_session()
        .args(["status", "--store-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("absent"))
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn status_shows_a_stored_session() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("foodshare_auth_access_token"),
        "eyJhbGciOiJIUzI1NiJ9.payload.sig",
    )
    .unwrap();
    std::fs::write(dir.path().join("foodshare_auth_refresh_token"), "R1").unwrap();

    fs_session()
        .args(["status", "--store-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("present"))
        .stdout(predicate::str::contains("eyJhbGci"))
        .stdout(predicate::str::contains("Signed in"));
}

#[test]
fn status_json_output() {
    let dir = tempfile::tempdir().unwrap();

    fs_session()
        .args(["status", "--format", "json", "--store-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signed_in\": false"))
        .stdout(predicate::str::contains("\"refresh_token_present\": false"));
}

#[test]
fn refresh_without_a_session_fails() {
    let dir = tempfile::tempdir().unwrap();

    // No refresh token stored, so the command fails before any network call.
    fs_session()
        .args(["refresh", "--store-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no refresh token available"));
}
