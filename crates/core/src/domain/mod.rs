use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of an agent inside a repository. Behavior (default prompt,
/// cleanup eligibility) branches on this exhaustively, so it is a
/// closed set rather than a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
  Supervisor,
  Worker,
  MergeQueue,
  PrShepherd,
  Workspace,
  Review,
}

impl AgentRole {
  /// Roles that may be reaped once their task is done. Supervisors and
  /// merge queues are long-lived and only leave with their repository.
  pub fn cleanup_eligible(self) -> bool {
    !matches!(self, AgentRole::Supervisor | AgentRole::MergeQueue)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AgentRole::Supervisor => "supervisor",
      AgentRole::Worker => "worker",
      AgentRole::MergeQueue => "merge-queue",
      AgentRole::PrShepherd => "pr-shepherd",
      AgentRole::Workspace => "workspace",
      AgentRole::Review => "review",
    }
  }
}

/// A tracked coding-agent process and its lifecycle bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
  pub role: AgentRole,
  /// Filesystem path of the agent's isolated checkout.
  pub worktree_path: String,
  /// Terminal-multiplexer window/pane reference used for delivery.
  pub mux_window: String,
  /// Externally observed session identifier, if any.
  #[serde(default)]
  pub session_id: Option<String>,
  /// OS process id backing the agent. `None` means no process has been
  /// recorded yet; the liveness sweep never treats that as dead.
  #[serde(default)]
  pub pid: Option<u32>,
  /// Current task description; empty means idle.
  #[serde(default)]
  pub task: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub last_nudge: Option<DateTime<Utc>>,
  /// Set by `complete_agent`; the reconciler removes the agent once its
  /// process is gone.
  #[serde(default)]
  pub ready_for_cleanup: bool,
}

impl Agent {
  pub fn new(role: AgentRole, worktree_path: &str, mux_window: &str) -> Self {
    Self {
      role,
      worktree_path: worktree_path.to_string(),
      mux_window: mux_window.to_string(),
      session_id: None,
      pid: None,
      task: String::new(),
      created_at: Utc::now(),
      last_nudge: None,
      ready_for_cleanup: false,
    }
  }

  pub fn is_idle(&self) -> bool {
    self.task.is_empty()
  }
}

/// One entry in a repository's append-only task history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
  pub agent: String,
  pub task: String,
  pub assigned_at: DateTime<Utc>,
}

/// A tracked repository with its agents and task history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
  pub url: String,
  /// Terminal-multiplexer session hosting this repository's windows.
  pub mux_session: String,
  #[serde(default)]
  pub agents: BTreeMap<String, Agent>,
  #[serde(default)]
  pub task_history: Vec<TaskRecord>,
}

impl Repository {
  pub fn new(url: &str, mux_session: &str) -> Self {
    Self {
      url: url.to_string(),
      mux_session: mux_session.to_string(),
      agents: BTreeMap::new(),
      task_history: Vec::new(),
    }
  }
}

/// The full persisted daemon state: everything under one document so a
/// single atomic rewrite keeps it consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
  #[serde(default)]
  pub repos: BTreeMap<String, Repository>,
}
