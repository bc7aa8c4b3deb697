use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::paths::{global_config_path, root_config_path};
use super::types::{Config, LogLevel, Result};
use crate::events::HookConfig;

/// Load configuration for a state root. The root config overrides the
/// global one; both override defaults. A missing file is not an error.
pub fn load(root: &Path) -> Result<Config> {
  let mut cfg = Config::default();

  if let Some(global_path) = global_config_path()
    && let Ok(s) = fs::read_to_string(&global_path)
  {
    let partial: PartialConfig = toml::from_str(&s)?;
    cfg = partial.merge_over(cfg);
  }

  if let Ok(s) = fs::read_to_string(root_config_path(root)) {
    let partial: PartialConfig = toml::from_str(&s)?;
    cfg = partial.merge_over(cfg);
  }

  Ok(cfg)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct PartialConfig {
  pub log_level: Option<LogLevel>,
  pub reconcile_interval_secs: Option<u64>,
  pub hook_timeout_secs: Option<u64>,
  pub hooks: Option<HookConfig>,
}

impl PartialConfig {
  fn merge_over(self, base: Config) -> Config {
    Config {
      log_level: self.log_level.unwrap_or(base.log_level),
      reconcile_interval_secs: self
        .reconcile_interval_secs
        .unwrap_or(base.reconcile_interval_secs),
      hook_timeout_secs: self.hook_timeout_secs.unwrap_or(base.hook_timeout_secs),
      // Hooks replace as a block; per-key merging would make it
      // impossible to unset a hook from the root config.
      hooks: self.hooks.unwrap_or(base.hooks),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_when_no_files() {
    let td = tempfile::tempdir().unwrap();
    let cfg = load(td.path()).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.reconcile_interval_secs, 5);
    assert_eq!(cfg.hook_timeout_secs, 30);
    assert!(cfg.hooks.on_event.is_none());
  }

  #[test]
  fn root_config_overrides_defaults() {
    let td = tempfile::tempdir().unwrap();
    fs::write(
      root_config_path(td.path()),
      r#"
log_level = "debug"
reconcile_interval_secs = 1

[hooks]
on_event = "/usr/local/bin/notify"
on_agent_started = "/usr/local/bin/on-start"
"#,
    )
    .unwrap();
    let cfg = load(td.path()).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.reconcile_interval_secs, 1);
    assert_eq!(cfg.hook_timeout_secs, 30);
    assert_eq!(cfg.hooks.on_event.as_deref(), Some("/usr/local/bin/notify"));
    assert_eq!(
      cfg.hooks.on_agent_started.as_deref(),
      Some("/usr/local/bin/on-start")
    );
  }

  #[test]
  fn invalid_toml_is_an_error() {
    let td = tempfile::tempdir().unwrap();
    fs::write(root_config_path(td.path()), "log_level = [broken").unwrap();
    assert!(load(td.path()).is_err());
  }
}
