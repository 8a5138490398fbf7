//! Configuration stored in `~/.salesdesk/config.json`.
//!
//! Every field is optional; a missing file means defaults. A file that
//! exists but cannot be read or parsed is an error, so a typo never silently
//! points the app at a fresh empty database.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::password::DEFAULT_PBKDF2_ITERATIONS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesConfig {
    /// Overrides the default `~/.salesdesk/salesdesk.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

fn default_password_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            password_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

/// Get the state directory (`~/.salesdesk`).
pub fn state_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".salesdesk"))
}

/// Load configuration from `~/.salesdesk/config.json`.
pub fn load_config() -> Result<SalesConfig, String> {
    load_config_from(&state_dir()?.join("config.json"))
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<SalesConfig, String> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(SalesConfig::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: SalesConfig =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    if config.password_iterations == 0 {
        return Err("passwordIterations must be at least 1".to_string());
    }

    Ok(config)
}
