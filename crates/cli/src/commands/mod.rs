pub mod agents;
pub mod daemon;
pub mod messages;
pub mod repos;

use muster_core::config::Paths;
use muster_core::protocol::Request;
use serde::de::DeserializeOwned;

use crate::rpc::client;
use crate::util::errors::render_rpc_failure;

pub(crate) fn block_on<F: std::future::Future>(fut: F) -> F::Output {
  tokio::runtime::Builder::new_current_thread()
    .enable_io()
    .enable_time()
    .build()
    .unwrap()
    .block_on(fut)
}

/// Run one request against the daemon; on failure print a friendly
/// message and exit non-zero.
pub(crate) fn call_or_exit(
  paths: &Paths,
  action: &str,
  req: &Request,
) -> Option<serde_json::Value> {
  match block_on(client::call(&paths.daemon_sock, req)) {
    Ok(data) => data,
    Err(e) => {
      eprintln!("{}", render_rpc_failure(action, &paths.daemon_sock, &e));
      std::process::exit(1);
    }
  }
}

pub(crate) fn call_typed_or_exit<T: DeserializeOwned>(
  paths: &Paths,
  action: &str,
  req: &Request,
) -> T {
  match block_on(client::call_typed(&paths.daemon_sock, req)) {
    Ok(v) => v,
    Err(e) => {
      eprintln!("{}", render_rpc_failure(action, &paths.daemon_sock, &e));
      std::process::exit(1);
    }
  }
}
