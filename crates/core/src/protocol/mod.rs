//! Control-socket wire protocol.
//!
//! One request per connection, one response back. The request carries
//! an open string-keyed `args` map for protocol flexibility; handlers
//! convert it into a typed params struct immediately via
//! [`Request::parse_args`] and never pass the raw map further.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  pub command: String,
  #[serde(default)]
  pub args: Map<String, Value>,
}

impl Request {
  pub fn new(command: &str) -> Self {
    Self {
      command: command.to_string(),
      args: Map::new(),
    }
  }

  pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.args.insert(key.to_string(), value.into());
    self
  }

  /// Deserialize the open args map into a typed params struct. The
  /// error string names the command so the caller sees which arguments
  /// were missing or malformed.
  pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, String> {
    serde_json::from_value(Value::Object(self.args.clone()))
      .map_err(|e| format!("invalid arguments for '{}': {}", self.command, e))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Response {
  pub fn ok(data: impl Serialize) -> Self {
    match serde_json::to_value(data) {
      Ok(v) => Self {
        success: true,
        data: Some(v),
        error: None,
      },
      Err(e) => Self::failure(format!("failed to encode response: {e}")),
    }
  }

  pub fn ok_empty() -> Self {
    Self {
      success: true,
      data: None,
      error: None,
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      success: false,
      data: None,
      error: Some(error.into()),
    }
  }
}

// ---- Typed command parameters ----

use crate::domain::AgentRole;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRepoParams {
  pub name: String,
  pub url: String,
  pub session: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoParams {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddAgentParams {
  pub repo: String,
  pub name: String,
  pub role: AgentRole,
  pub worktree: String,
  pub window: String,
  #[serde(default)]
  pub pid: Option<u32>,
  #[serde(default)]
  pub task: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListAgentsParams {
  pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
  pub repo: String,
  pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTaskParams {
  pub repo: String,
  pub agent: String,
  pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageParams {
  pub repo: String,
  pub from: String,
  pub to: String,
  pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckMessageParams {
  pub repo: String,
  pub agent: String,
  pub id: String,
}

/// Response payload for `ping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
  pub version: String,
  pub pid: u32,
  pub socket_path: String,
}

/// One repository in a `list_repos` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
  pub name: String,
  pub url: String,
  pub session: String,
  pub agents: Vec<String>,
}

/// One agent in a `list_agents` (or agent-mutating) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
  pub name: String,
  #[serde(flatten)]
  pub agent: crate::domain::Agent,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_round_trips_with_open_args() {
    let req = Request::new("send_message")
      .arg("repo", "demo")
      .arg("from", "supervisor")
      .arg("to", "w1")
      .arg("body", "hello");
    let json = serde_json::to_string(&req).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, req);
  }

  #[test]
  fn args_default_to_empty_map() {
    let req: Request = serde_json::from_str(r#"{"command":"list_repos"}"#).unwrap();
    assert!(req.args.is_empty());
  }

  #[test]
  fn parse_args_into_typed_struct() {
    let req = Request::new("complete_agent")
      .arg("repo", "demo")
      .arg("agent", "w1");
    let p: AgentParams = req.parse_args().unwrap();
    assert_eq!(p.repo, "demo");
    assert_eq!(p.agent, "w1");
  }

  #[test]
  fn parse_args_reports_missing_fields() {
    let req = Request::new("complete_agent").arg("agent", "w1");
    let err = req.parse_args::<AgentParams>().unwrap_err();
    assert!(err.contains("complete_agent"), "error names command: {err}");
    assert!(err.contains("repo"), "error names missing field: {err}");
  }

  #[test]
  fn response_error_is_omitted_on_success() {
    let json = serde_json::to_string(&Response::ok(serde_json::json!({"n": 1}))).unwrap();
    assert!(!json.contains("error"));
    let json = serde_json::to_string(&Response::failure("nope")).unwrap();
    assert!(!json.contains("data"));
    assert!(json.contains("nope"));
  }

  #[test]
  fn add_agent_params_accept_role_strings() {
    let req = Request::new("add_agent")
      .arg("repo", "demo")
      .arg("name", "mq")
      .arg("role", "merge-queue")
      .arg("worktree", "/tmp/mq")
      .arg("window", "demo:2");
    let p: AddAgentParams = req.parse_args().unwrap();
    assert_eq!(p.role, AgentRole::MergeQueue);
    assert_eq!(p.pid, None);
  }
}
