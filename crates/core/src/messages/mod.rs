//! Per-agent mailboxes, persisted as append-ordered JSON logs.
//!
//! One file per (repository, agent) under the messages directory.
//! Appends and status transitions for a mailbox run under that
//! mailbox's own lock; different mailboxes never contend. Messages are
//! never deleted, the log doubles as history for audit views.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Delivery status. Transitions are monotonic: pending → delivered →
/// acknowledged. The derived ordering backs the no-regress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
  Pending,
  Delivered,
  Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub id: String,
  pub from: String,
  pub to: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub status: MessageStatus,
}

#[derive(Debug, Error)]
pub enum MessageError {
  #[error("io: {0}")]
  Io(#[from] io::Error),
  #[error("mailbox parse error: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("unknown message id '{0}'")]
  UnknownMessage(String),
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// Manages all mailboxes under one messages directory.
pub struct Manager {
  dir: PathBuf,
  // One lock per mailbox, created on first touch.
  locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl Manager {
  pub fn new(dir: &Path) -> Self {
    Self {
      dir: dir.to_path_buf(),
      locks: Mutex::new(HashMap::new()),
    }
  }

  fn mailbox_lock(&self, repo: &str, agent: &str) -> Arc<Mutex<()>> {
    let mut locks = self.locks.lock();
    locks
      .entry((repo.to_string(), agent.to_string()))
      .or_default()
      .clone()
  }

  fn mailbox_path(&self, repo: &str, agent: &str) -> PathBuf {
    self.dir.join(repo).join(format!("{agent}.json"))
  }

  /// Append a new pending message to the recipient's mailbox and
  /// return it. Safe to call concurrently; ordering within one mailbox
  /// is by append order under the mailbox lock.
  pub fn send(&self, repo: &str, from: &str, to: &str, body: &str) -> Result<Message> {
    let lock = self.mailbox_lock(repo, to);
    let _guard = lock.lock();

    let msg = Message {
      id: Uuid::new_v4().to_string(),
      from: from.to_string(),
      to: to.to_string(),
      body: body.to_string(),
      created_at: Utc::now(),
      status: MessageStatus::Pending,
    };

    let path = self.mailbox_path(repo, to);
    let mut all = read_mailbox(&path)?;
    all.push(msg.clone());
    write_mailbox(&path, &all)?;
    Ok(msg)
  }

  /// All messages for a mailbox, oldest first. A missing mailbox is an
  /// empty one.
  pub fn list(&self, repo: &str, agent: &str) -> Result<Vec<Message>> {
    let lock = self.mailbox_lock(repo, agent);
    let _guard = lock.lock();
    read_mailbox(&self.mailbox_path(repo, agent))
  }

  pub fn mark_delivered(&self, repo: &str, agent: &str, id: &str) -> Result<Message> {
    self.advance(repo, agent, id, MessageStatus::Delivered)
  }

  pub fn mark_acknowledged(&self, repo: &str, agent: &str, id: &str) -> Result<Message> {
    self.advance(repo, agent, id, MessageStatus::Acknowledged)
  }

  /// Move a message's status forward. A transition that would move it
  /// backward is a no-op, so idempotent retries are safe.
  fn advance(&self, repo: &str, agent: &str, id: &str, to: MessageStatus) -> Result<Message> {
    let lock = self.mailbox_lock(repo, agent);
    let _guard = lock.lock();

    let path = self.mailbox_path(repo, agent);
    let mut all = read_mailbox(&path)?;
    let msg = all
      .iter_mut()
      .find(|m| m.id == id)
      .ok_or_else(|| MessageError::UnknownMessage(id.to_string()))?;
    if to > msg.status {
      msg.status = to;
    }
    let updated = msg.clone();
    write_mailbox(&path, &all)?;
    Ok(updated)
  }
}

fn read_mailbox(path: &Path) -> Result<Vec<Message>> {
  match fs::read_to_string(path) {
    Ok(s) => Ok(serde_json::from_str(&s)?),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(e) => Err(e.into()),
  }
}

fn write_mailbox(path: &Path, messages: &[Message]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let json = serde_json::to_string_pretty(messages)?;
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, json)?;
  fs::rename(&tmp, path)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;
  use std::sync::Arc as StdArc;
  use std::thread;

  fn manager() -> (tempfile::TempDir, Manager) {
    let td = tempfile::tempdir().unwrap();
    let mgr = Manager::new(&td.path().join("messages"));
    (td, mgr)
  }

  #[test]
  fn send_appends_pending_message() {
    let (_td, mgr) = manager();
    let msg = mgr.send("demo", "supervisor", "w1", "hello").unwrap();
    assert_eq!(msg.status, MessageStatus::Pending);
    assert!(!msg.id.is_empty());

    let all = mgr.list("demo", "w1").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], msg);
  }

  #[test]
  fn missing_mailbox_lists_empty() {
    let (_td, mgr) = manager();
    assert!(mgr.list("demo", "nobody").unwrap().is_empty());
  }

  #[test]
  fn list_preserves_append_order() {
    let (_td, mgr) = manager();
    for i in 0..5 {
      mgr.send("demo", "supervisor", "w1", &format!("m{i}")).unwrap();
    }
    let bodies: Vec<_> = mgr
      .list("demo", "w1")
      .unwrap()
      .into_iter()
      .map(|m| m.body)
      .collect();
    assert_eq!(bodies, vec!["m0", "m1", "m2", "m3", "m4"]);
  }

  #[test]
  fn concurrent_sends_to_one_mailbox_all_arrive() {
    let (_td, mgr) = manager();
    let mgr = StdArc::new(mgr);
    let mut handles = Vec::new();
    for t in 0..4 {
      let mgr = mgr.clone();
      handles.push(thread::spawn(move || {
        for i in 0..10 {
          mgr
            .send("demo", &format!("sender-{t}"), "w1", &format!("{t}-{i}"))
            .unwrap();
        }
      }));
    }
    for h in handles {
      h.join().unwrap();
    }
    let all = mgr.list("demo", "w1").unwrap();
    assert_eq!(all.len(), 40);
    // Every message appears exactly once.
    let mut ids: Vec<_> = all.iter().map(|m| m.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
    // Per-sender order is append order.
    for t in 0..4 {
      let seq: Vec<_> = all
        .iter()
        .filter(|m| m.from == format!("sender-{t}"))
        .map(|m| m.body.clone())
        .collect();
      let expected: Vec<_> = (0..10).map(|i| format!("{t}-{i}")).collect();
      assert_eq!(seq, expected);
    }
  }

  #[test]
  fn status_transitions_are_monotonic() {
    let (_td, mgr) = manager();
    let msg = mgr.send("demo", "supervisor", "w1", "hello").unwrap();

    let m = mgr.mark_acknowledged("demo", "w1", &msg.id).unwrap();
    assert_eq!(m.status, MessageStatus::Acknowledged);
    // A later delivery attempt must not regress the status.
    let m = mgr.mark_delivered("demo", "w1", &msg.id).unwrap();
    assert_eq!(m.status, MessageStatus::Acknowledged);
    // Re-acknowledging is a no-op, not a failure.
    let m = mgr.mark_acknowledged("demo", "w1", &msg.id).unwrap();
    assert_eq!(m.status, MessageStatus::Acknowledged);
  }

  #[test]
  fn unknown_message_id_is_an_error() {
    let (_td, mgr) = manager();
    mgr.send("demo", "supervisor", "w1", "hello").unwrap();
    let err = mgr.mark_delivered("demo", "w1", "no-such-id").unwrap_err();
    assert!(matches!(err, MessageError::UnknownMessage(_)));
  }

  #[test]
  fn mailboxes_are_isolated() {
    let (_td, mgr) = manager();
    mgr.send("demo", "supervisor", "w1", "for w1").unwrap();
    mgr.send("demo", "supervisor", "w2", "for w2").unwrap();
    mgr.send("other", "supervisor", "w1", "other repo").unwrap();

    assert_eq!(mgr.list("demo", "w1").unwrap().len(), 1);
    assert_eq!(mgr.list("demo", "w2").unwrap().len(), 1);
    assert_eq!(mgr.list("other", "w1").unwrap().len(), 1);
  }

  proptest! {
    #[test]
    fn bodies_survive_the_mailbox_file(body in "\\PC{0,64}") {
      let (_td, mgr) = manager();
      let sent = mgr.send("demo", "supervisor", "w1", &body).unwrap();
      let all = mgr.list("demo", "w1").unwrap();
      prop_assert_eq!(&all[0].body, &body);
      prop_assert_eq!(&all[0].id, &sent.id);
    }
  }
}
