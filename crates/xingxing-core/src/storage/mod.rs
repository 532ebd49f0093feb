mod config;
pub mod habit_db;
pub mod migrations;

pub use config::{Config, MedicationConfig, SettlementConfig};
pub use habit_db::HabitDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `XINGXING_DATA_DIR` wins when set. Otherwise `~/.config/xingxing[-dev]/`
/// based on `XINGXING_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("XINGXING_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("XINGXING_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("xingxing-dev")
            } else {
                base_dir.join("xingxing")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
