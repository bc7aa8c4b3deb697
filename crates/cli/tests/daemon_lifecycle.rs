use assert_cmd::prelude::*;
use std::path::Path;
use std::process::Command;

fn muster(root: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
  let mut cmd = Command::cargo_bin("muster").expect("compile bin");
  cmd.env("MUSTER_ROOT", root).args(args).assert()
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
  String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

#[test]
fn full_lifecycle_over_a_background_daemon() {
  let td = tempfile::tempdir().expect("tempdir");
  let root = td.path();

  let out = stdout_of(muster(root, &["daemon", "start"]).success());
  assert!(out.contains("daemon: running"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["repos"]).success());
  assert!(out.contains("no repositories tracked"), "stdout: {}", out);

  let out = stdout_of(
    muster(
      root,
      &["add-repo", "demo", "https://github.com/acme/demo", "--session", "muster-demo"],
    )
    .success(),
  );
  assert!(out.contains("repo demo tracked"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["repos"]).success());
  assert!(out.contains("demo"), "stdout: {}", out);
  assert!(out.contains("https://github.com/acme/demo"), "stdout: {}", out);

  let out = stdout_of(
    muster(
      root,
      &[
        "add-agent", "demo", "w1", "--role", "worker", "--worktree", "/tmp/w1", "--window",
        "demo:1",
      ],
    )
    .success(),
  );
  assert!(out.contains("agent w1 (worker) registered"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["agents", "demo"]).success());
  assert!(out.contains("w1"), "stdout: {}", out);
  assert!(out.contains("idle"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["assign", "demo", "w1", "fix the flaky test"]).success());
  assert!(out.contains("fix the flaky test"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["send", "demo", "w1", "please rebase"]).success());
  assert!(out.contains("queued"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["messages", "demo", "w1"]).success());
  assert!(out.contains("[human] please rebase"), "stdout: {}", out);

  // Usage errors come back as ordinary failures, with the daemon's
  // remediation hint.
  let err = muster(root, &["assign", "ghost", "w1", "x"]).failure();
  let text = String::from_utf8_lossy(&err.get_output().stderr).to_string();
  assert!(text.contains("muster repos"), "stderr: {}", text);

  let out = stdout_of(muster(root, &["daemon", "stop"]).success());
  assert!(out.contains("daemon: stopped"), "stdout: {}", out);

  let out = stdout_of(muster(root, &["daemon", "status"]).success());
  assert!(out.contains("daemon: stopped"), "stdout: {}", out);
}
