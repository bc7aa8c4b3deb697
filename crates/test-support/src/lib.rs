use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Temporary state root for daemon tests.
pub struct TempRoot {
  pub dir: tempfile::TempDir,
}

impl Default for TempRoot {
  fn default() -> Self {
    Self::new()
  }
}

impl TempRoot {
  pub fn new() -> Self {
    Self {
      dir: tempfile::tempdir().expect("tempdir"),
    }
  }

  pub fn path(&self) -> PathBuf {
    self.dir.path().to_path_buf()
  }

  /// Write a config.toml into the root.
  pub fn write_config(&self, toml: &str) {
    std::fs::write(self.path().join("config.toml"), toml).expect("write config.toml");
  }

  /// Write an executable shell hook and return its path as a string.
  pub fn write_hook(&self, name: &str, body: &str) -> String {
    let path = self.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write hook");
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod hook");
    }
    path.display().to_string()
  }
}

/// Poll a condition repeatedly until it returns true or times out.
/// Returns true if the condition was met, false on timeout.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = bool>,
{
  use tokio::time::{Instant, sleep};
  let start = Instant::now();
  loop {
    if check().await {
      return true;
    }
    if start.elapsed() >= timeout {
      return false;
    }
    sleep(interval).await;
  }
}

/// Control-socket response as tests observe it on the wire.
#[derive(Debug, serde::Deserialize)]
pub struct RawResponse {
  pub success: bool,
  pub data: Option<serde_json::Value>,
  pub error: Option<String>,
}

/// A tiny control-socket client: one newline-delimited JSON request per
/// connection, one response back.
pub struct SocketClient {
  sock: PathBuf,
}

impl SocketClient {
  pub fn new<P: AsRef<Path>>(sock: P) -> Self {
    Self {
      sock: sock.as_ref().to_path_buf(),
    }
  }

  pub async fn call(&self, command: &str, args: serde_json::Value) -> RawResponse {
    self
      .try_call(command, args)
      .await
      .expect("control socket call failed")
  }

  pub async fn try_call(
    &self,
    command: &str,
    args: serde_json::Value,
  ) -> std::io::Result<RawResponse> {
    let stream = UnixStream::connect(&self.sock).await?;
    let (read_half, mut write_half) = stream.into_split();

    let mut payload = serde_json::to_vec(&serde_json::json!({
      "command": command,
      "args": args,
    }))
    .expect("encode request");
    payload.push(b'\n');
    write_half.write_all(&payload).await?;
    write_half.shutdown().await?;

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    serde_json::from_str(&line).map_err(std::io::Error::other)
  }
}
