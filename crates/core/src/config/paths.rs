use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::{ConfigError, Result};

/// Filesystem layout under one daemon's state root. One daemon instance
/// is authoritative for exactly one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
  pub root: PathBuf,
  pub daemon_pid: PathBuf,
  pub daemon_sock: PathBuf,
  pub daemon_log: PathBuf,
  pub state_file: PathBuf,
  pub messages_dir: PathBuf,
  pub worktrees_dir: PathBuf,
}

impl Paths {
  pub fn new(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      daemon_pid: root.join("daemon.pid"),
      daemon_sock: root.join("daemon.sock"),
      daemon_log: root.join("daemon.log"),
      state_file: root.join("state.json"),
      messages_dir: root.join("messages"),
      worktrees_dir: root.join("worktrees"),
    }
  }

  /// Create the root and its subdirectories if missing.
  pub fn ensure_directories(&self) -> io::Result<()> {
    fs::create_dir_all(&self.root)?;
    fs::create_dir_all(&self.messages_dir)?;
    fs::create_dir_all(&self.worktrees_dir)?;
    Ok(())
  }
}

/// Location of the global config file (~/.config/muster/config.toml)
pub fn global_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|p| p.join("muster").join("config.toml"))
}

/// Location of the per-root config file (<root>/config.toml)
pub fn root_config_path(root: &Path) -> PathBuf {
  root.join("config.toml")
}

/// Resolve the state root from MUSTER_ROOT or the platform data dir.
pub fn resolve_state_root() -> Result<PathBuf> {
  if let Some(root) = env::var_os("MUSTER_ROOT") {
    return Ok(PathBuf::from(root));
  }
  dirs::data_dir()
    .map(|d| d.join("muster"))
    .ok_or(ConfigError::NoStateRoot)
}

/// Resolve the full path layout for the active state root.
pub fn resolve_paths() -> Result<Paths> {
  Ok(Paths::new(&resolve_state_root()?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn layout_is_rooted() {
    let p = Paths::new(Path::new("/tmp/muster-test"));
    assert_eq!(p.daemon_sock, Path::new("/tmp/muster-test/daemon.sock"));
    assert_eq!(p.state_file, Path::new("/tmp/muster-test/state.json"));
    assert_eq!(p.messages_dir, Path::new("/tmp/muster-test/messages"));
  }

  #[test]
  fn ensure_directories_is_idempotent() {
    let td = tempfile::tempdir().unwrap();
    let p = Paths::new(&td.path().join("root"));
    p.ensure_directories().unwrap();
    p.ensure_directories().unwrap();
    assert!(p.messages_dir.is_dir());
    assert!(p.worktrees_dir.is_dir());
  }
}
