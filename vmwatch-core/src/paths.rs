//! Centralized path configuration for vmwatch.
//!
//! The daemon and any tooling resolve the config location through here so
//! a system install and a user install behave the same way.

use std::path::PathBuf;

/// Get the vmwatch configuration directory.
///
/// Resolution order:
/// 1. `VMWATCH_CONFIG_DIR` environment variable
/// 2. `/etc/vmwatch` if it exists (system install)
/// 3. `~/.config/vmwatch` for user-only installs
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VMWATCH_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    let system_dir = PathBuf::from("/etc/vmwatch");
    if system_dir.exists() {
        return system_dir;
    }

    dirs::config_dir().map(|c| c.join("vmwatch")).unwrap_or(system_dir)
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}
