use std::path::Path;

use muster_core::protocol::{DaemonStatus, Request, Response};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("{0}")]
  Daemon(String),
  #[error("daemon closed the connection without responding")]
  Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;

/// One request per connection: write a JSON line, half-close, read the
/// response line back.
pub async fn call(sock: &Path, req: &Request) -> Result<Option<serde_json::Value>> {
  debug!(event = "rpc_call", command = %req.command);
  let stream = UnixStream::connect(sock).await?;
  let (read_half, mut write_half) = stream.into_split();

  let mut payload = serde_json::to_vec(req)?;
  payload.push(b'\n');
  write_half.write_all(&payload).await?;
  write_half.shutdown().await?;

  let mut line = String::new();
  BufReader::new(read_half).read_line(&mut line).await?;
  if line.trim().is_empty() {
    return Err(Error::Disconnected);
  }
  let resp: Response = serde_json::from_str(line.trim())?;
  if resp.success {
    Ok(resp.data)
  } else {
    Err(Error::Daemon(
      resp.error.unwrap_or_else(|| "unknown error".to_string()),
    ))
  }
}

pub async fn call_typed<T: DeserializeOwned>(sock: &Path, req: &Request) -> Result<T> {
  let data = call(sock, req)
    .await?
    .ok_or_else(|| Error::Daemon("missing response data".to_string()))?;
  Ok(serde_json::from_value(data)?)
}

pub async fn daemon_status(sock: &Path) -> Result<DaemonStatus> {
  call_typed(sock, &Request::new("ping")).await
}

pub async fn daemon_shutdown(sock: &Path) -> Result<()> {
  let _ = call(sock, &Request::new("shutdown")).await?;
  Ok(())
}
