use std::path::Path;

use crate::rpc::client;

pub fn render_rpc_failure(action: &str, sock: &Path, err: &client::Error) -> String {
  match err {
    client::Error::Io(_) | client::Error::Disconnected => format!(
      "{} failed: daemon not reachable at {}.",
      action,
      sock.display()
    ),
    _ => format!("{} failed: {}", action, err),
  }
}
