use std::fs;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{Daemon, handlers};
use crate::protocol::{Request, Response};

/// Start the control-socket accept loop. One newline-delimited JSON
/// request per connection, one response back, then the server closes
/// the connection.
pub fn start(
  daemon: Arc<Daemon>,
  shutdown_tx: watch::Sender<bool>,
  mut shutdown_rx: watch::Receiver<bool>,
) -> io::Result<JoinHandle<()>> {
  let socket_path = daemon.paths.daemon_sock.clone();
  if let Some(parent) = socket_path.parent() {
    fs::create_dir_all(parent)?;
  }
  // Remove stale socket if present
  let _ = fs::remove_file(&socket_path);

  let listener = UnixListener::bind(&socket_path)?;

  let task = tokio::spawn(async move {
    loop {
      tokio::select! {
        _ = shutdown_rx.changed() => {
          info!(event = "server_shutdown", "shutdown signal received; stopping accept loop");
          break;
        }
        res = listener.accept() => {
          match res {
            Ok((stream, _addr)) => {
              let daemon = daemon.clone();
              let shutdown = shutdown_tx.clone();
              tokio::spawn(async move {
                if let Err(e) = serve_connection(&daemon, stream, &shutdown).await {
                  warn!(event = "connection_error", error = %e, "connection handling failed");
                }
              });
            }
            Err(e) => {
              error!(event = "accept_error", error = %e, "accept failed");
              break;
            }
          }
        }
      }
    }
    // Best-effort cleanup
    let _ = fs::remove_file(&socket_path);
    info!(event = "server_stopped", socket = %socket_path.display(), "control socket closed");
  });

  Ok(task)
}

/// Read one request, dispatch it, write one response. A malformed
/// request is answered with a failure response, never a dropped
/// connection.
async fn serve_connection(
  daemon: &Daemon,
  stream: UnixStream,
  shutdown: &watch::Sender<bool>,
) -> io::Result<()> {
  let (read_half, mut write_half) = stream.into_split();
  let mut reader = BufReader::new(read_half);
  let mut line = String::new();
  reader.read_line(&mut line).await?;

  let response = match serde_json::from_str::<Request>(&line) {
    Ok(req) => handlers::dispatch(daemon, &req, shutdown).await,
    Err(e) => Response::failure(format!("malformed request: {e}")),
  };

  let mut payload = serde_json::to_vec(&response).unwrap_or_else(|_| {
    // Failure responses are plain strings; this fallback cannot carry
    // anything unserializable.
    b"{\"success\":false,\"error\":\"internal encoding error\"}".to_vec()
  });
  payload.push(b'\n');
  write_half.write_all(&payload).await?;
  write_half.shutdown().await?;
  Ok(())
}
