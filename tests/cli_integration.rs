//! End-to-end tests of the `bileto` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ADMIN: &str = "admin@example.com";

#[allow(deprecated)]
fn bileto(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bileto").unwrap();
    cmd.current_dir(dir)
        .env_remove("BILETO_PROJECT")
        .env_remove("BILETO__SESSION__USER")
        .env("NO_COLOR", "1");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    bileto(&dir)
        .args(["init", "--name", "Helpdesk", "--admin-email", ADMIN])
        .assert()
        .success();
    bileto(&dir)
        .args(["org", "add", "Acme", "--domains", "acme.com"])
        .assert()
        .success();
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    bileto(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ticket"))
        .stdout(predicate::str::contains("contract"));
}

#[test]
fn test_commands_require_a_project() {
    let dir = TempDir::new().unwrap();
    bileto(&dir)
        .args(["ticket", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not initialized"));
}

#[test]
fn test_init_twice_fails() {
    let dir = init_project();
    bileto(&dir)
        .args(["init", "--admin-email", ADMIN])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_ticket_flow() {
    let dir = init_project();

    bileto(&dir)
        .args(["ticket", "new", "Printer is offline", "--org", "Acme", "-m", "Second floor"])
        .assert()
        .success();

    bileto(&dir)
        .args(["ticket", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer is offline"));

    bileto(&dir)
        .args(["search", "printer org:Acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer is offline"));

    bileto(&dir)
        .args(["search", "status:closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer is offline").not());
}

#[test]
fn test_json_output() {
    let dir = init_project();

    let output = bileto(&dir).args(["--json", "org", "list"]).output().unwrap();
    assert!(output.status.success());
    let organizations: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(organizations[0]["name"], "Acme");
}

#[test]
fn test_invalid_query_reports_position() {
    let dir = init_project();
    bileto(&dir)
        .args(["search", "status:bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid search query at position"));
}

#[test]
fn test_unknown_session_user() {
    let dir = init_project();
    bileto(&dir)
        .args(["--as", "nobody@example.com", "ticket", "list"])
        .assert()
        .failure();
}
