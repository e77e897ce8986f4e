mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, PreferencesConfig, SuggestionsConfig};
pub use database::HabitDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding the database and config file.
///
/// `HABITUAL_HOME` overrides the location outright. Otherwise this is
/// `~/.config/habitual[-dev]/`, with HABITUAL_ENV=dev selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HABITUAL_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HABITUAL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitual-dev")
            } else {
                base_dir.join("habitual")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
