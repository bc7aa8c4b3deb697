use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn repos_shows_actionable_daemon_not_reachable_message() {
  // A regular file as the state root: the background daemon cannot
  // create its directories, so nothing ever serves the socket.
  let td = tempfile::tempdir().expect("tempdir");
  let root = td.path().join("not-a-dir");
  std::fs::write(&root, "x").expect("write file");

  let mut cmd = Command::cargo_bin("muster").expect("compile bin");
  let output = cmd
    .env("MUSTER_ROOT", &root)
    .args(["repos"])
    .assert()
    .failure()
    .get_output()
    .stderr
    .clone();
  let err = String::from_utf8_lossy(&output);
  assert!(err.contains("daemon not reachable"), "stderr: {}", err);
  assert!(err.contains("daemon.sock"), "stderr: {}", err);
}

#[test]
fn daemon_status_without_daemon_prints_stopped() {
  let td = tempfile::tempdir().expect("tempdir");
  let mut cmd = Command::cargo_bin("muster").expect("compile bin");
  let output = cmd
    .env("MUSTER_ROOT", td.path())
    .args(["daemon", "status"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let text = String::from_utf8_lossy(&output);
  assert!(text.contains("daemon: stopped"), "stdout: {}", text);
}

#[test]
fn no_args_prints_help() {
  let mut cmd = Command::cargo_bin("muster").expect("compile bin");
  cmd
    .assert()
    .success()
    .stdout(predicates::str::contains("Usage"));
}
