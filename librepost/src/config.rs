//! Configuration management for Repost

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub vk: VkConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/repost/repost.db".to_string(),
        }
    }
}

/// Which outcomes let an article move to `posted`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Any dispatch that ran to completion counts
    #[default]
    Attempted,
    AnySucceeded,
    AllSucceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on a single adapter call (humantime, e.g. "30s")
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout: String,
    #[serde(default)]
    pub status_policy: StatusPolicy,
    /// Skip accounts that already have a successful record for the article
    #[serde(default)]
    pub skip_delivered: bool,
}

fn default_adapter_timeout() -> String {
    "30s".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: default_adapter_timeout(),
            status_policy: StatusPolicy::default(),
            skip_delivered: false,
        }
    }
}

impl DispatchConfig {
    pub fn adapter_timeout(&self) -> Result<Duration> {
        let timeout = humantime::parse_duration(&self.adapter_timeout).map_err(|e| {
            ConfigError::InvalidValue {
                field: "dispatch.adapter_timeout".to_string(),
                reason: e.to_string(),
            }
        })?;

        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.adapter_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_caption_limit")]
    pub caption_limit: usize,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_caption_limit() -> usize {
    1024
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            caption_limit: default_caption_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VkConfig {
    #[serde(default = "default_vk_api_base")]
    pub api_base: String,
    #[serde(default = "default_vk_api_version")]
    pub api_version: String,
}

fn default_vk_api_base() -> String {
    "https://api.vk.com/method".to_string()
}

fn default_vk_api_version() -> String {
    "5.199".to_string()
}

impl Default for VkConfig {
    fn default() -> Self {
        Self {
            api_base: default_vk_api_base(),
            api_version: default_vk_api_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Public channel preview root
    #[serde(default = "default_sources_base_url")]
    pub base_url: String,
    /// Messages kept per source on each fetch
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

fn default_sources_base_url() -> String {
    "https://t.me/s".to_string()
}

fn default_fetch_limit() -> usize {
    3
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_sources_base_url(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.dispatch.adapter_timeout()?;

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }
        if self.telegram.caption_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telegram.caption_limit".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.vk.api_version.trim().is_empty() {
            return Err(ConfigError::MissingField("vk.api_version".to_string()).into());
        }
        if self.sources.fetch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sources.fetch_limit".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Database path with `~` expanded
    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).to_string()
    }
}

/// Resolve the configuration file path (`REPOST_CONFIG`, then the XDG config dir)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("REPOST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("repost").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.telegram.caption_limit, 1024);
        assert_eq!(config.vk.api_version, "5.199");
        assert_eq!(config.sources.fetch_limit, 3);
        assert_eq!(config.dispatch.status_policy, StatusPolicy::Attempted);
        assert!(!config.dispatch.skip_delivered);
        assert_eq!(
            config.dispatch.adapter_timeout().unwrap(),
            Duration::from_secs(30)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[database]
path = "/tmp/repost-test.db"

[dispatch]
adapter_timeout = "5s"
status_policy = "all_succeeded"
skip_delivered = true
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.database.path, "/tmp/repost-test.db");
        assert_eq!(config.dispatch.adapter_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(config.dispatch.status_policy, StatusPolicy::AllSucceeded);
        assert!(config.dispatch.skip_delivered);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.dispatch.adapter_timeout = "0s".to_string();
        assert!(config.validate().is_err());

        config.dispatch.adapter_timeout = "soon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_caption_limit_is_rejected() {
        let mut config = Config::default();
        config.telegram.caption_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("telegram.caption_limit"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[dispatch\nadapter_timeout = 3").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        std::env::set_var("REPOST_CONFIG", "/tmp/custom/repost.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var("REPOST_CONFIG");
        assert_eq!(path, PathBuf::from("/tmp/custom/repost.toml"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        std::env::set_var("REPOST_CONFIG", path.to_string_lossy().to_string());
        let config = Config::load();
        std::env::remove_var("REPOST_CONFIG");

        let config = config.unwrap();
        assert_eq!(config.telegram.caption_limit, 1024);
    }
}
