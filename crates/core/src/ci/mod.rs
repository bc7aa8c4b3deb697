//! CI-status collaborator: maps the hosting provider's latest workflow
//! run for a branch onto a closed status set. Consumed by merge-queue
//! agents; the daemon itself never calls this.

use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiStatus {
  Success,
  Failure,
  Pending,
  Unknown,
}

/// The full answer for one branch check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiCheck {
  pub status: CiStatus,
  pub checked_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure_info: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum CiError {
  #[error("gh run list failed: {0}")]
  Gh(String),
  #[error("gh not available: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("failed to parse gh output: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("gh run list timed out")]
  Timeout,
}

/// One workflow run as reported by `gh run list --json`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
  pub name: String,
  pub status: String,
  // Empty until the run completes.
  #[serde(default)]
  pub conclusion: String,
  pub url: String,
}

/// Map run status × conclusion onto the closed status set:
/// completed+success → success; completed+{failure,timed_out,cancelled}
/// → failure; completed+skipped → unknown; queued/in_progress →
/// pending; anything else → unknown.
pub fn classify(run: &WorkflowRun) -> (CiStatus, Option<String>) {
  match run.status.as_str() {
    "completed" => match run.conclusion.as_str() {
      "success" => (CiStatus::Success, None),
      "failure" | "timed_out" | "cancelled" => (
        CiStatus::Failure,
        Some(format!("workflow '{}' {}", run.name, run.conclusion)),
      ),
      "skipped" => (
        CiStatus::Unknown,
        Some(format!("workflow '{}' was skipped", run.name)),
      ),
      other => (
        CiStatus::Unknown,
        Some(format!("workflow '{}' has unknown conclusion: {other}", run.name)),
      ),
    },
    "queued" | "in_progress" => (CiStatus::Pending, None),
    other => (
      CiStatus::Unknown,
      Some(format!("workflow '{}' has unknown status: {other}", run.name)),
    ),
  }
}

/// Query the latest workflow run for a branch via the `gh` CLI.
pub async fn check_ci_status(owner: &str, repo: &str, branch: &str) -> Result<CiCheck, CiError> {
  let fut = Command::new("gh")
    .args([
      "run",
      "list",
      "--repo",
      &format!("{owner}/{repo}"),
      "--branch",
      branch,
      "--limit",
      "1",
      "--json",
      "name,status,conclusion,url,headBranch",
    ])
    .stdin(Stdio::null())
    .kill_on_drop(true)
    .output();
  let out = tokio::time::timeout(Duration::from_secs(30), fut)
    .await
    .map_err(|_| CiError::Timeout)??;
  if !out.status.success() {
    return Err(CiError::Gh(
      String::from_utf8_lossy(&out.stderr).trim().to_string(),
    ));
  }

  let runs: Vec<WorkflowRun> = serde_json::from_slice(&out.stdout)?;
  let checked_at = Utc::now();
  let Some(run) = runs.first() else {
    return Ok(CiCheck {
      status: CiStatus::Unknown,
      checked_at,
      failure_info: Some(format!("no workflow runs found for branch {branch}")),
      workflow_name: None,
      run_url: None,
    });
  };

  let (status, failure_info) = classify(run);
  Ok(CiCheck {
    status,
    checked_at,
    failure_info,
    workflow_name: Some(run.name.clone()),
    run_url: Some(run.url.clone()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(status: &str, conclusion: &str) -> WorkflowRun {
    WorkflowRun {
      name: "ci".to_string(),
      status: status.to_string(),
      conclusion: conclusion.to_string(),
      url: "https://example.com/run/1".to_string(),
    }
  }

  #[test]
  fn completed_success_is_success() {
    assert_eq!(classify(&run("completed", "success")).0, CiStatus::Success);
  }

  #[test]
  fn completed_failures_are_failure() {
    for conclusion in ["failure", "timed_out", "cancelled"] {
      let (status, info) = classify(&run("completed", conclusion));
      assert_eq!(status, CiStatus::Failure);
      assert!(info.unwrap().contains(conclusion));
    }
  }

  #[test]
  fn skipped_is_unknown() {
    let (status, info) = classify(&run("completed", "skipped"));
    assert_eq!(status, CiStatus::Unknown);
    assert!(info.unwrap().contains("skipped"));
  }

  #[test]
  fn queued_and_in_progress_are_pending() {
    assert_eq!(classify(&run("queued", "")).0, CiStatus::Pending);
    assert_eq!(classify(&run("in_progress", "")).0, CiStatus::Pending);
  }

  #[test]
  fn anything_else_is_unknown() {
    assert_eq!(classify(&run("waiting", "")).0, CiStatus::Unknown);
    assert_eq!(classify(&run("completed", "neutral")).0, CiStatus::Unknown);
  }
}
