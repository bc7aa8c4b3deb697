use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;

use tracing::{info, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use crate::config::LogLevel;

static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize structured JSON logging to the daemon log file.
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(log_path: &Path, level: LogLevel) {
  if let Some(parent) = log_path.parent() {
    let _ = fs::create_dir_all(parent);
  }

  let file = match OpenOptions::new().create(true).append(true).open(log_path) {
    Ok(f) => f,
    Err(_) => return,
  };

  // Non-blocking writer so disk stalls never block RPC handlers or the
  // reconciliation loop. The guard must stay alive for the process.
  let (nb_writer, guard) = tracing_appender::non_blocking(file);
  let _ = WORKER_GUARD.set(guard);

  let filter = EnvFilter::new(match level {
    LogLevel::Off => "off",
    LogLevel::Warn => "warn",
    LogLevel::Info => "info",
    LogLevel::Debug => "debug",
    LogLevel::Trace => "trace",
  });

  let json_layer = fmt::layer()
    .with_timer(ChronoUtc::rfc_3339())
    .json()
    .with_level(true)
    .with_target(false)
    .with_writer(move || nb_writer.clone());

  let subscriber = Registry::default().with(filter).with(json_layer);
  let _ = set_global_default(subscriber);

  info!(
    event = "logging_initialized",
    log_path = %log_path.display(),
    level = ?level,
    "logging initialized"
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::Value;
  use std::{thread, time::Duration};

  #[test]
  fn writes_json_lines() {
    let td = tempfile::tempdir().unwrap();
    let log = td.path().join("daemon.log");

    init(&log, LogLevel::Info);
    info!(event = "test_marker", "marker line");

    // Let the background worker flush.
    thread::sleep(Duration::from_millis(50));

    let s = fs::read_to_string(&log).expect("read log");
    assert!(s.lines().count() >= 1, "no log lines written");
    for line in s.lines() {
      let v: Value = serde_json::from_str(line).expect("each line is json");
      assert!(v.get("timestamp").is_some());
      assert!(v.get("level").is_some());
    }
  }
}
