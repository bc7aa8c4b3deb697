use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MuxError {
  #[error("tmux not available: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("tmux {command} failed: {detail}")]
  Command { command: String, detail: String },
  #[error("tmux {0} timed out")]
  Timeout(String),
}

pub type Result<T> = std::result::Result<T, MuxError>;

/// Terminal-multiplexer collaborator. The daemon only delivers text
/// into windows and probes their existence; creating sessions and
/// windows is provisioning and happens elsewhere.
#[async_trait]
pub trait Multiplexer: Send + Sync {
  /// Paste `text` into the window and submit it.
  async fn send_text(&self, session: &str, window: &str, text: &str) -> Result<()>;
  /// Non-destructive existence check for a window.
  async fn window_exists(&self, session: &str, window: &str) -> Result<bool>;
}

/// Production implementation backed by the `tmux` binary. Every call is
/// bounded by a timeout so a wedged tmux server cannot stall the
/// reconciliation loop.
pub struct TmuxMultiplexer {
  timeout: Duration,
}

impl TmuxMultiplexer {
  pub fn new(timeout: Duration) -> Self {
    Self { timeout }
  }

  async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
    debug!(event = "tmux_exec", args = ?args, "running tmux");
    let fut = Command::new("tmux")
      .args(args)
      .stdin(Stdio::null())
      .kill_on_drop(true)
      .output();
    match tokio::time::timeout(self.timeout, fut).await {
      Ok(out) => Ok(out?),
      Err(_) => Err(MuxError::Timeout(args.first().unwrap_or(&"tmux").to_string())),
    }
  }
}

impl Default for TmuxMultiplexer {
  fn default() -> Self {
    Self::new(Duration::from_secs(5))
  }
}

#[async_trait]
impl Multiplexer for TmuxMultiplexer {
  async fn send_text(&self, session: &str, window: &str, text: &str) -> Result<()> {
    let target = format!("{session}:{window}");
    let out = self
      .run(&["send-keys", "-t", &target, text, "Enter"])
      .await?;
    if out.status.success() {
      Ok(())
    } else {
      Err(MuxError::Command {
        command: "send-keys".to_string(),
        detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
      })
    }
  }

  async fn window_exists(&self, session: &str, window: &str) -> Result<bool> {
    let target = format!("{session}:{window}");
    // list-panes exits non-zero when the target is gone; that is the
    // answer, not an error.
    let out = self.run(&["list-panes", "-t", &target]).await?;
    Ok(out.status.success())
  }
}
