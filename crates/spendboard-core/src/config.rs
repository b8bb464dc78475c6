//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! API location, request timeout, where the credential record is kept, and
//! the last email used to log in.
//!
//! Configuration is stored at `~/.config/spendboard/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE_URL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "spendboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential storage file name (file backend)
const STORAGE_FILE: &str = "storage.json";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "SPENDBOARD_API_URL";

/// Where the persisted credential record lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Unset means requests wait for the server indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_check_expiry_on_navigate")]
    pub check_expiry_on_navigate: bool,
    #[serde(default)]
    pub storage_backend: StorageBackend,
}

fn default_check_expiry_on_navigate() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            last_email: None,
            request_timeout_secs: None,
            check_expiry_on_navigate: default_check_expiry_on_navigate(),
            storage_backend: StorageBackend::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    /// Path of the credential storage file used by the file backend
    pub fn storage_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORAGE_FILE))
    }

    /// API base URL: environment override, then config, then the default
    pub fn api_base_url(&self) -> String {
        self.api_base_url_with(std::env::var(API_URL_ENV).ok())
    }

    fn api_base_url_with(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.check_expiry_on_navigate);
        assert_eq!(config.storage_backend, StorageBackend::File);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_storage_backend_names() {
        let config: Config = serde_json::from_str(r#"{"storage_backend": "keyring"}"#).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Keyring);
    }

    #[test]
    fn test_api_base_url_precedence() {
        let mut config = Config::default();
        assert_eq!(config.api_base_url_with(None), DEFAULT_API_BASE_URL);

        config.api_base_url = Some("http://localhost:8000/api".to_string());
        assert_eq!(config.api_base_url_with(None), "http://localhost:8000/api");
        assert_eq!(
            config.api_base_url_with(Some("http://staging/api".to_string())),
            "http://staging/api"
        );
        assert_eq!(
            config.api_base_url_with(Some("  ".to_string())),
            "http://localhost:8000/api"
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spendboard").join("config.json");

        let config = Config {
            last_email: Some("a@x.io".to_string()),
            request_timeout_secs: Some(15),
            check_expiry_on_navigate: false,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("a@x.io"));
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(15)));
        assert!(!loaded.check_expiry_on_navigate);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(config.last_email.is_none());
    }
}
