//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides the API base URL.
pub const API_URL_ENV: &str = "LEARNINFIVE_API_URL";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the LearnInFive API (default: http://localhost:8000)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Date format for history timestamps
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// How long the "saved" confirmation stays visible
    #[serde(default = "default_saved_indicator_secs")]
    pub saved_indicator_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            saved_indicator_secs: default_saved_indicator_secs(),
        }
    }
}

fn default_date_format() -> String {
    "%b %d, %Y %I:%M %p".to_string()
}

fn default_saved_indicator_secs() -> u64 {
    3
}

/// Session persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file path (default: <data dir>/learn-in-five/session.json)
    #[serde(default)]
    pub path: Option<String>,
}

/// Optional "#RRGGBB" colour overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub accent: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Config {
    /// Load configuration from default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::from_file(&config_path.to_string_lossy())
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &str) -> Result<Self> {
        let expanded = expand_path(path);
        let content = std::fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read config file {}", expanded))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", expanded))?;
        Ok(config)
    }

    /// Apply the API URL environment override, if set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }

    /// Get the default config path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("learn-in-five")
            .join("config.toml")
    }

    /// Get the data directory for the session file and logs.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("learn-in-five")
    }

    /// Get the log file path.
    pub fn log_path() -> PathBuf {
        Self::data_dir().join("learn-in-five.log")
    }

    /// Get the persisted session file path.
    pub fn session_path(&self) -> PathBuf {
        match &self.session.path {
            Some(path) => PathBuf::from(expand_path(path)),
            None => Self::data_dir().join("session.json"),
        }
    }
}

/// Expand ~ to home directory.
fn expand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.display.saved_indicator_secs, 3);
        assert!(config.session.path.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://api.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.connect_timeout_secs, 10);
        assert_eq!(config.display.date_format, "%b %d, %Y %I:%M %p");
    }

    #[test]
    fn test_session_path_override() {
        let mut config = Config::default();
        config.session.path = Some("/tmp/lif/session.json".to_string());
        assert_eq!(config.session_path(), PathBuf::from("/tmp/lif/session.json"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display]\nsaved_indicator_secs = 5\n").unwrap();

        let config = Config::from_file(&path.to_string_lossy()).unwrap();
        assert_eq!(config.display.saved_indicator_secs, 5);
    }
}
