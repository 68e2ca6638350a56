//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the identity API key, an optional identity endpoint
//! override, and the last used email.
//!
//! Configuration is stored at `~/.config/recipebook/config.json`.
//! Environment variables take precedence over the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_IDENTITY_BASE_URL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "recipebook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the identity API key
pub const API_KEY_ENV: &str = "RECIPEBOOK_API_KEY";

/// Environment variable overriding the identity base URL
pub const IDENTITY_URL_ENV: &str = "RECIPEBOOK_IDENTITY_URL";

/// Environment variable overriding where the session record is kept
pub const DATA_DIR_ENV: &str = "RECIPEBOOK_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub identity_base_url: Option<String>,
    pub last_email: Option<String>,
}

/// Prefer a non-empty environment value over a non-empty configured one
fn pick(env_value: Option<String>, configured: Option<&String>) -> Option<String> {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| configured.filter(|v| !v.trim().is_empty()).cloned())
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The identity API key, from the environment or the config file
    pub fn api_key(&self) -> Result<String> {
        pick(std::env::var(API_KEY_ENV).ok(), self.api_key.as_ref()).ok_or_else(|| {
            anyhow::anyhow!(
                "No identity API key configured. Set {} or api_key in config.json",
                API_KEY_ENV
            )
        })
    }

    pub fn identity_base_url(&self) -> String {
        pick(
            std::env::var(IDENTITY_URL_ENV).ok(),
            self.identity_base_url.as_ref(),
        )
        .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_string())
    }

    /// Directory the session record lives in
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = pick(std::env::var(DATA_DIR_ENV).ok(), None) {
            return Ok(PathBuf::from(dir));
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_environment() {
        let configured = "from-file".to_string();
        assert_eq!(
            pick(Some("from-env".to_string()), Some(&configured)),
            Some("from-env".to_string())
        );
        assert_eq!(pick(None, Some(&configured)), Some("from-file".to_string()));
    }

    #[test]
    fn test_pick_skips_blank_values() {
        let blank = "  ".to_string();
        assert_eq!(pick(Some(String::new()), Some(&blank)), None);

        let configured = "from-file".to_string();
        assert_eq!(pick(Some(" ".to_string()), Some(&configured)), Some("from-file".to_string()));
    }

    #[test]
    fn test_config_file_shape() {
        let json = r#"{"api_key":"abc","identity_base_url":null,"last_email":"a@b.com"}"#;
        let config: Config = serde_json::from_str(json).expect("Failed to parse config");
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert!(config.identity_base_url.is_none());
        assert_eq!(config.last_email.as_deref(), Some("a@b.com"));
    }
}
