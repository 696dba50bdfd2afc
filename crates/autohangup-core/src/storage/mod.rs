mod config;

pub use config::{
    Config, CountdownConfig, NotificationsConfig, PermissionsConfig, TelephonyConfig,
    DEFAULT_WORK_NAME,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/autohangup[-dev]/` based on AUTOHANGUP_ENV.
///
/// Set AUTOHANGUP_ENV=dev to use the development data directory, or
/// AUTOHANGUP_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("AUTOHANGUP_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("AUTOHANGUP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("autohangup-dev")
            } else {
                base_dir.join("autohangup")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
