use std::path::{Path, PathBuf};

use muster_core::config::{self, Paths};

use crate::rpc::client;

pub fn resolve() -> Option<Paths> {
  config::resolve_paths().ok()
}

/// Resolve the state root and make sure a daemon is serving it,
/// spawning one in the background if needed. Exits the process when no
/// state root can be resolved.
pub fn ensure_daemon_running() -> Paths {
  let paths = match resolve() {
    Some(p) => p,
    None => {
      eprintln!("could not resolve a state root; set MUSTER_ROOT");
      std::process::exit(1);
    }
  };

  let ok = tokio::runtime::Builder::new_current_thread()
    .enable_io()
    .enable_time()
    .build()
    .unwrap()
    .block_on(async { client::daemon_status(&paths.daemon_sock).await.is_ok() });
  if ok {
    return paths;
  }

  let _ = spawn_daemon_background(&paths.root);

  let _ = tokio::runtime::Builder::new_current_thread()
    .enable_io()
    .enable_time()
    .build()
    .unwrap()
    .block_on(async {
      for _ in 0..20u8 {
        if client::daemon_status(&paths.daemon_sock).await.is_ok() {
          return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
      }
      false
    });
  paths
}

pub fn spawn_daemon_background(root: &Path) -> std::io::Result<()> {
  let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("muster"));
  let mut cmd = std::process::Command::new(exe);
  cmd.arg("daemon").arg("run");
  cmd.env("MUSTER_ROOT", root);
  cmd
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null());
  let _ = cmd.spawn()?;
  Ok(())
}
