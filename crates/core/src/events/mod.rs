//! Fire-and-forget lifecycle event dispatch.
//!
//! Hooks are external executables invoked as `hook <event-type>
//! <event-json>`. Dispatch never blocks the emitter: each hook runs on
//! a detached task with a hard timeout, and its exit code and output
//! are ignored. There is no retry and no delivery guarantee.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

/// Closed set of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
  AgentStarted,
  AgentStopped,
  AgentIdle,
  AgentFailed,
  PrCreated,
  PrMerged,
  PrClosed,
  TaskAssigned,
  TaskComplete,
  CiFailed,
  CiPassed,
  MessageSent,
  WorkerStuck,
}

impl EventType {
  pub fn as_str(self) -> &'static str {
    match self {
      EventType::AgentStarted => "agent_started",
      EventType::AgentStopped => "agent_stopped",
      EventType::AgentIdle => "agent_idle",
      EventType::AgentFailed => "agent_failed",
      EventType::PrCreated => "pr_created",
      EventType::PrMerged => "pr_merged",
      EventType::PrClosed => "pr_closed",
      EventType::TaskAssigned => "task_assigned",
      EventType::TaskComplete => "task_complete",
      EventType::CiFailed => "ci_failed",
      EventType::CiPassed => "ci_passed",
      EventType::MessageSent => "message_sent",
      EventType::WorkerStuck => "worker_stuck",
    }
  }
}

/// An ephemeral event value; exists only for the duration of dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  #[serde(rename = "type")]
  pub kind: EventType,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repo: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub agent: Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub data: BTreeMap<String, serde_json::Value>,
}

impl Event {
  pub fn new(kind: EventType) -> Self {
    Self {
      kind,
      timestamp: Utc::now(),
      repo: None,
      agent: None,
      data: BTreeMap::new(),
    }
  }

  pub fn repo(mut self, repo: &str) -> Self {
    self.repo = Some(repo.to_string());
    self
  }

  pub fn agent(mut self, agent: &str) -> Self {
    self.agent = Some(agent.to_string());
    self
  }

  pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
    self.data.insert(key.to_string(), value.into());
    self
  }
}

/// Hook executables keyed by event type, plus a catch-all. The generic
/// and type-specific hooks are both invoked for a matching event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_event: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_agent_started: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_agent_stopped: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_agent_idle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_pr_created: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_pr_merged: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_task_assigned: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_task_complete: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_ci_failed: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_message_sent: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_worker_stuck: Option<String>,
}

impl HookConfig {
  /// The type-specific hook for an event, if one is configured.
  fn specific_hook(&self, kind: EventType) -> Option<&str> {
    let hook = match kind {
      EventType::AgentStarted => &self.on_agent_started,
      EventType::AgentStopped => &self.on_agent_stopped,
      EventType::AgentIdle => &self.on_agent_idle,
      EventType::PrCreated => &self.on_pr_created,
      EventType::PrMerged => &self.on_pr_merged,
      EventType::TaskAssigned => &self.on_task_assigned,
      EventType::TaskComplete => &self.on_task_complete,
      EventType::CiFailed => &self.on_ci_failed,
      EventType::MessageSent => &self.on_message_sent,
      EventType::WorkerStuck => &self.on_worker_stuck,
      _ => &None,
    };
    hook.as_deref()
  }
}

/// Dispatches events to configured hook executables.
pub struct Bus {
  config: RwLock<HookConfig>,
  hook_timeout: Duration,
}

impl Bus {
  pub fn new(config: HookConfig, hook_timeout: Duration) -> Self {
    Self {
      config: RwLock::new(config),
      hook_timeout,
    }
  }

  /// Replace the hook configuration. Visible to subsequent emits;
  /// in-flight emits keep the snapshot they captured.
  pub fn update_config(&self, config: HookConfig) {
    *self.config.write() = config;
  }

  /// Emit an event. Synchronous to enqueue, asynchronous to execute:
  /// hook processes run on detached tasks and are never awaited here.
  pub fn emit(&self, event: Event) {
    let config = self.config.read().clone();

    let payload = match serde_json::to_string(&event) {
      Ok(p) => p,
      Err(e) => {
        warn!(event = "hook_encode_failed", error = %e, "dropping unencodable event");
        return;
      }
    };

    if let Some(hook) = &config.on_event {
      spawn_hook(hook.clone(), event.kind, payload.clone(), self.hook_timeout);
    }
    if let Some(hook) = config.specific_hook(event.kind) {
      spawn_hook(hook.to_string(), event.kind, payload, self.hook_timeout);
    }
  }
}

fn spawn_hook(hook: String, kind: EventType, payload: String, timeout: Duration) {
  tokio::spawn(async move {
    debug!(event = "hook_dispatch", hook = %hook, kind = kind.as_str(), "invoking hook");
    let child = Command::new(&hook)
      .arg(kind.as_str())
      .arg(&payload)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .kill_on_drop(true)
      .spawn();
    let mut child = match child {
      Ok(c) => c,
      Err(e) => {
        warn!(event = "hook_spawn_failed", hook = %hook, error = %e, "hook did not start");
        return;
      }
    };
    match tokio::time::timeout(timeout, child.wait()).await {
      Ok(Ok(_status)) => {}
      Ok(Err(e)) => {
        warn!(event = "hook_wait_failed", hook = %hook, error = %e, "hook wait failed");
      }
      Err(_) => {
        warn!(event = "hook_timeout", hook = %hook, kind = kind.as_str(), "killing hung hook");
        let _ = child.start_kill();
      }
    }
  });
}
