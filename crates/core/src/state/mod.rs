//! Authoritative, durably persisted daemon state.
//!
//! All access goes through [`StateStore`]: writes take the exclusive
//! lock, apply the in-memory mutation, and rewrite `state.json`
//! atomically before the lock is released. If the durable write fails
//! the in-memory state is rolled back to the pre-mutation snapshot, so
//! a reader never observes state that was not (or will never be)
//! persisted. Reads take the shared lock and return copies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Agent, Repository, State, TaskRecord};

#[derive(Debug, Error)]
pub enum StateError {
  #[error("repository '{0}' already exists")]
  RepoExists(String),
  #[error("unknown repository '{0}'")]
  UnknownRepo(String),
  #[error("agent '{agent}' already exists in repository '{repo}'")]
  AgentExists { repo: String, agent: String },
  #[error("unknown agent '{agent}' in repository '{repo}'")]
  UnknownAgent { repo: String, agent: String },
  #[error("failed to persist state: {0}")]
  Persist(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;

pub struct StateStore {
  path: PathBuf,
  inner: RwLock<State>,
}

impl StateStore {
  /// Load the store from `path`, starting empty if the file is missing
  /// or unreadable. A corrupt state file is logged, not fatal; the last
  /// durable snapshot wins on the next successful persist.
  pub fn load(path: &Path) -> Self {
    let state = match fs::read_to_string(path) {
      Ok(s) => match serde_json::from_str::<State>(&s) {
        Ok(state) => state,
        Err(e) => {
          warn!(event = "state_parse_failed", path = %path.display(), error = %e, "starting with empty state");
          State::default()
        }
      },
      Err(_) => State::default(),
    };
    info!(event = "state_loaded", path = %path.display(), repos = state.repos.len(), "state loaded");
    Self {
      path: path.to_path_buf(),
      inner: RwLock::new(state),
    }
  }

  /// Apply a mutation and persist the result. On persist failure the
  /// pre-mutation snapshot is restored and the error surfaced, so the
  /// mutation is not considered committed.
  fn mutate<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
    let mut state = self.inner.write();
    let snapshot = state.clone();
    let out = f(&mut state)?;
    if let Err(e) = persist(&self.path, &state) {
      *state = snapshot;
      return Err(StateError::Persist(e));
    }
    Ok(out)
  }

  pub fn add_repo(&self, name: &str, repo: Repository) -> Result<()> {
    self.mutate(|state| {
      if state.repos.contains_key(name) {
        return Err(StateError::RepoExists(name.to_string()));
      }
      state.repos.insert(name.to_string(), repo);
      Ok(())
    })
  }

  /// Remove a repository and all its agents. Idempotent.
  pub fn remove_repo(&self, name: &str) -> Result<()> {
    self.mutate(|state| {
      state.repos.remove(name);
      Ok(())
    })
  }

  pub fn get_repo(&self, name: &str) -> Option<Repository> {
    self.inner.read().repos.get(name).cloned()
  }

  /// Snapshot of repository names and their records.
  pub fn list_repos(&self) -> Vec<(String, Repository)> {
    self
      .inner
      .read()
      .repos
      .iter()
      .map(|(n, r)| (n.clone(), r.clone()))
      .collect()
  }

  pub fn add_agent(&self, repo: &str, name: &str, agent: Agent) -> Result<()> {
    self.mutate(|state| {
      let r = state
        .repos
        .get_mut(repo)
        .ok_or_else(|| StateError::UnknownRepo(repo.to_string()))?;
      if r.agents.contains_key(name) {
        return Err(StateError::AgentExists {
          repo: repo.to_string(),
          agent: name.to_string(),
        });
      }
      r.agents.insert(name.to_string(), agent);
      Ok(())
    })
  }

  /// A missing agent is a normal miss, not an error.
  pub fn get_agent(&self, repo: &str, name: &str) -> Option<Agent> {
    self
      .inner
      .read()
      .repos
      .get(repo)
      .and_then(|r| r.agents.get(name))
      .cloned()
  }

  pub fn list_agents(&self, repo: &str) -> Result<Vec<(String, Agent)>> {
    let state = self.inner.read();
    let r = state
      .repos
      .get(repo)
      .ok_or_else(|| StateError::UnknownRepo(repo.to_string()))?;
    Ok(r.agents.iter().map(|(n, a)| (n.clone(), a.clone())).collect())
  }

  /// Remove an agent. Removing an absent agent (or an agent of an
  /// absent repository) is a no-op, so retries are safe.
  pub fn remove_agent(&self, repo: &str, name: &str) -> Result<()> {
    self.mutate(|state| {
      if let Some(r) = state.repos.get_mut(repo) {
        r.agents.remove(name);
      }
      Ok(())
    })
  }

  /// Apply an in-place update to an existing agent.
  pub fn update_agent(
    &self,
    repo: &str,
    name: &str,
    f: impl FnOnce(&mut Agent),
  ) -> Result<Agent> {
    self.mutate(|state| {
      let r = state
        .repos
        .get_mut(repo)
        .ok_or_else(|| StateError::UnknownRepo(repo.to_string()))?;
      let agent = r.agents.get_mut(name).ok_or_else(|| StateError::UnknownAgent {
        repo: repo.to_string(),
        agent: name.to_string(),
      })?;
      f(agent);
      Ok(agent.clone())
    })
  }

  /// Assign a task to an agent and append it to the repository's
  /// task history.
  pub fn assign_task(&self, repo: &str, name: &str, task: &str) -> Result<Agent> {
    self.mutate(|state| {
      let r = state
        .repos
        .get_mut(repo)
        .ok_or_else(|| StateError::UnknownRepo(repo.to_string()))?;
      let agent = r.agents.get_mut(name).ok_or_else(|| StateError::UnknownAgent {
        repo: repo.to_string(),
        agent: name.to_string(),
      })?;
      agent.task = task.to_string();
      let cloned = agent.clone();
      r.task_history.push(TaskRecord {
        agent: name.to_string(),
        task: task.to_string(),
        assigned_at: chrono::Utc::now(),
      });
      Ok(cloned)
    })
  }
}

/// Rewrite the state file atomically: write a sibling temp file, then
/// rename over the target so watchers never observe a partial document.
fn persist(path: &Path, state: &State) -> io::Result<()> {
  let json = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, json)?;
  fs::rename(&tmp, path)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::AgentRole;

  fn store() -> (tempfile::TempDir, StateStore) {
    let td = tempfile::tempdir().unwrap();
    let store = StateStore::load(&td.path().join("state.json"));
    (td, store)
  }

  fn demo_repo() -> Repository {
    Repository::new("https://github.com/acme/demo", "muster-demo")
  }

  fn worker() -> Agent {
    Agent::new(AgentRole::Worker, "/tmp/wt", "demo:1")
  }

  #[test]
  fn duplicate_repo_rejected() {
    let (_td, store) = store();
    store.add_repo("demo", demo_repo()).unwrap();
    let err = store.add_repo("demo", demo_repo()).unwrap_err();
    assert!(matches!(err, StateError::RepoExists(_)));
    assert_eq!(store.list_repos().len(), 1);
  }

  #[test]
  fn duplicate_agent_rejected_without_mutation() {
    let (_td, store) = store();
    store.add_repo("demo", demo_repo()).unwrap();
    store.add_agent("demo", "w1", worker()).unwrap();

    let mut other = worker();
    other.task = "something else".into();
    let err = store.add_agent("demo", "w1", other).unwrap_err();
    assert!(matches!(err, StateError::AgentExists { .. }));
    // First write wins; the duplicate did not overwrite anything.
    assert_eq!(store.get_agent("demo", "w1").unwrap().task, "");
  }

  #[test]
  fn agent_requires_repo() {
    let (_td, store) = store();
    let err = store.add_agent("nope", "w1", worker()).unwrap_err();
    assert!(matches!(err, StateError::UnknownRepo(_)));
  }

  #[test]
  fn get_agent_miss_is_none() {
    let (_td, store) = store();
    store.add_repo("demo", demo_repo()).unwrap();
    assert!(store.get_agent("demo", "ghost").is_none());
    assert!(store.get_agent("ghost", "ghost").is_none());
  }

  #[test]
  fn remove_agent_is_idempotent() {
    let (_td, store) = store();
    store.add_repo("demo", demo_repo()).unwrap();
    store.add_agent("demo", "w1", worker()).unwrap();

    store.remove_agent("demo", "w1").unwrap();
    let after_once = store.list_agents("demo").unwrap();
    store.remove_agent("demo", "w1").unwrap();
    let after_twice = store.list_agents("demo").unwrap();
    assert_eq!(after_once, after_twice);
    assert!(after_twice.is_empty());
    // Absent repo is also a no-op.
    store.remove_agent("ghost", "w1").unwrap();
  }

  #[test]
  fn persists_and_reloads_identically() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("state.json");
    {
      let store = StateStore::load(&path);
      store.add_repo("demo", demo_repo()).unwrap();
      store.add_agent("demo", "w1", worker()).unwrap();
      store
        .update_agent("demo", "w1", |a| a.pid = Some(4242))
        .unwrap();
      store.assign_task("demo", "w1", "fix bug").unwrap();
    }
    let reloaded = StateStore::load(&path);
    let repos = reloaded.list_repos();
    assert_eq!(repos.len(), 1);
    let agent = reloaded.get_agent("demo", "w1").unwrap();
    assert_eq!(agent.pid, Some(4242));
    assert_eq!(agent.task, "fix bug");
    assert_eq!(reloaded.get_repo("demo").unwrap().task_history.len(), 1);
  }

  #[test]
  fn missing_state_file_starts_empty() {
    let td = tempfile::tempdir().unwrap();
    let store = StateStore::load(&td.path().join("does-not-exist.json"));
    assert!(store.list_repos().is_empty());
  }

  #[test]
  fn corrupt_state_file_starts_empty() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("state.json");
    fs::write(&path, "{not json").unwrap();
    let store = StateStore::load(&path);
    assert!(store.list_repos().is_empty());
  }

  #[test]
  fn failed_persist_rolls_back() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("state.json");
    let store = StateStore::load(&path);
    store.add_repo("demo", demo_repo()).unwrap();

    // Make the state file path unwritable by turning it into a
    // directory; the rename in persist() will fail.
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    let err = store.add_repo("other", demo_repo()).unwrap_err();
    assert!(matches!(err, StateError::Persist(_)));
    // In-memory state matches the last durable snapshot.
    assert_eq!(store.list_repos().len(), 1);
    assert!(store.get_repo("other").is_none());
  }

  #[test]
  fn update_agent_unknown_targets_fail() {
    let (_td, store) = store();
    store.add_repo("demo", demo_repo()).unwrap();
    let err = store.update_agent("demo", "ghost", |_| {}).unwrap_err();
    assert!(matches!(err, StateError::UnknownAgent { .. }));
    let err = store.update_agent("ghost", "w1", |_| {}).unwrap_err();
    assert!(matches!(err, StateError::UnknownRepo(_)));
  }
}
