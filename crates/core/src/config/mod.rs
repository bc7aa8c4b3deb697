mod load;
mod paths;
mod types;

pub use load::load;
pub use paths::{Paths, global_config_path, resolve_paths, resolve_state_root, root_config_path};
pub use types::{Config, ConfigError, LogLevel, Result};
