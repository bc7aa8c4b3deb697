//! The long-lived orchestration daemon: owns the state store, message
//! manager, and event bus, serves the control socket, and runs the
//! reconciliation loop. One daemon instance per state root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

mod handlers;
mod reconcile;
mod server;

pub use handlers::dispatch;
pub use reconcile::tick;

use crate::adapters::{Multiplexer, ProcessProbe, SignalProbe, TmuxMultiplexer};
use crate::config::{self, Config, Paths};
use crate::events::Bus;
use crate::messages::Manager;
use crate::state::StateStore;

/// Shared daemon context, injected into every handler and into the
/// reconciliation loop. No ambient globals: all mutable state lives
/// behind the store's and bus's own locks.
pub struct Daemon {
  pub paths: Paths,
  pub config: Config,
  pub state: Arc<StateStore>,
  pub messages: Arc<Manager>,
  pub events: Arc<Bus>,
  pub mux: Arc<dyn Multiplexer>,
  pub probe: Arc<dyn ProcessProbe>,
}

impl Daemon {
  /// Build a daemon with production collaborators (tmux + signal-0
  /// probe). Fails only on unusable paths or unreadable config; a
  /// missing state file starts empty.
  pub fn new(paths: Paths) -> config::Result<Arc<Self>> {
    Self::with_collaborators(paths, Arc::new(TmuxMultiplexer::default()), Arc::new(SignalProbe))
  }

  /// Build a daemon with injected collaborators. Used by tests to
  /// swap the terminal multiplexer and the liveness probe.
  pub fn with_collaborators(
    paths: Paths,
    mux: Arc<dyn Multiplexer>,
    probe: Arc<dyn ProcessProbe>,
  ) -> config::Result<Arc<Self>> {
    paths.ensure_directories()?;
    let config = config::load(&paths.root)?;
    let state = Arc::new(StateStore::load(&paths.state_file));
    let messages = Arc::new(Manager::new(&paths.messages_dir));
    let events = Arc::new(Bus::new(
      config.hooks.clone(),
      Duration::from_secs(config.hook_timeout_secs),
    ));
    Ok(Arc::new(Self {
      paths,
      config,
      state,
      messages,
      events,
      mux,
      probe,
    }))
  }

  /// Bind the control socket, then run the accept loop and the
  /// reconciliation loop until shutdown.
  pub fn start(self: &Arc<Self>) -> io::Result<DaemonHandle> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = server::start(self.clone(), shutdown_tx.clone(), shutdown_rx.clone())?;
    let reconciler = reconcile::spawn(self.clone(), shutdown_rx);

    // Record our pid so collaborators can tell a stale socket from a
    // live daemon.
    fs::write(&self.paths.daemon_pid, std::process::id().to_string())?;

    info!(
      event = "daemon_started",
      socket = %self.paths.daemon_sock.display(),
      pid = std::process::id(),
      "daemon started"
    );

    Ok(DaemonHandle {
      server,
      reconciler,
      shutdown_tx,
      socket_path: self.paths.daemon_sock.clone(),
      pid_path: self.paths.daemon_pid.clone(),
    })
  }
}

/// Handle to a running daemon.
pub struct DaemonHandle {
  server: JoinHandle<()>,
  reconciler: JoinHandle<()>,
  shutdown_tx: watch::Sender<bool>,
  socket_path: PathBuf,
  pid_path: PathBuf,
}

impl DaemonHandle {
  /// Send the shutdown signal without consuming the handle.
  pub fn request_stop(&self) {
    let _ = self.shutdown_tx.send(true);
  }

  /// Resolves once shutdown has been signaled, whether over the control
  /// socket or via [`request_stop`](Self::request_stop).
  pub async fn stopped(&self) {
    let mut rx = self.shutdown_tx.subscribe();
    if *rx.borrow() {
      return;
    }
    let _ = rx.changed().await;
  }

  /// Signal shutdown and abandon the background tasks. Removes the
  /// socket and pid files, best effort.
  pub fn stop(self) {
    let _ = self.shutdown_tx.send(true);
    self.server.abort();
    self.reconciler.abort();
    let _ = fs::remove_file(&self.socket_path);
    let _ = fs::remove_file(&self.pid_path);
  }

  /// Wait for both loops to exit (after a shutdown RPC or signal).
  pub async fn wait(self) {
    let _ = self.server.await;
    let _ = self.reconciler.await;
    let _ = fs::remove_file(&self.socket_path);
    let _ = fs::remove_file(&self.pid_path);
  }

  pub fn socket_path(&self) -> &Path {
    &self.socket_path
  }
}
