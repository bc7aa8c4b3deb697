use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::HookConfig;

/// Log level for the daemon and CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Off,
  Warn,
  #[default]
  Info,
  Debug,
  Trace,
}

/// Effective configuration after merging defaults, the global file, and
/// the state-root file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  pub log_level: LogLevel,
  /// Seconds between reconciliation ticks (message routing + reaping).
  pub reconcile_interval_secs: u64,
  /// Hard timeout for a single event-hook invocation.
  pub hook_timeout_secs: u64,
  /// Event hook executables, keyed by event type plus a generic one.
  #[serde(default)]
  pub hooks: HookConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      log_level: LogLevel::Info,
      reconcile_interval_secs: 5,
      hook_timeout_secs: 30,
      hooks: HookConfig::default(),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("could not resolve a state root; set MUSTER_ROOT")]
  NoStateRoot,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
