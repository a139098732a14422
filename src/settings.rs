//! Runtime settings, read from settings.json next to the binary.
//!
//! A missing file just means defaults; a file that exists but doesn't parse
//! is a startup error, since silently ignoring a typo'd config is worse.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {SETTINGS_FILENAME}: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse {SETTINGS_FILENAME}: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub database_path: String,
    pub static_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            database_path: "todos.redb".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings, SettingsError> {
        Self::load_from(SETTINGS_FILENAME)
    }

    fn load_from(path: &str) -> Result<Settings, SettingsError> {
        if !Path::new(path).exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
