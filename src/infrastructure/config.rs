//! Configuration file and token resolution.
//!
//! Handles the optional TOML settings file and the token lookup chain
//! (command-line flag, environment, config file).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{AppError, Result};

/// Environment variable consulted for the API token.
pub const TOKEN_ENV_VAR: &str = "CLICKUP_API_TOKEN";

/// Settings loaded from the optional config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// ClickUp personal API token.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Root directory for backup runs.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl BackupConfig {
    /// Directory holding the config file (`~/.clickup-chat-backup`).
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clickup-chat-backup")
    }

    /// Path of the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }
}

/// Load configuration from the default location, or defaults when absent.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<BackupConfig> {
    let config_path = BackupConfig::config_file_path();

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(BackupConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<BackupConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Resolve the API token: flag, then environment, then config file.
#[must_use]
pub fn resolve_token(flag: Option<&str>, config: &BackupConfig) -> Option<String> {
    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    resolve_token_from(flag, env_token, config)
}

fn resolve_token_from(
    flag: Option<&str>,
    env_token: Option<String>,
    config: &BackupConfig,
) -> Option<String> {
    flag.map(str::to_string)
        .filter(|token| !token.is_empty())
        .or_else(|| env_token.filter(|token| !token.is_empty()))
        .or_else(|| config.api_token.clone().filter(|token| !token.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config: BackupConfig = toml::from_str(
            r#"
            api_token = "pk_123"
            output_dir = "/tmp/backups"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("pk_123"));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/backups")));
    }

    #[test]
    fn test_empty_config_parses() {
        let config: BackupConfig = toml::from_str("").unwrap();
        assert!(config.api_token.is_none());
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_token = \"pk_456\"\n").unwrap();

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.api_token.as_deref(), Some("pk_456"));
    }

    #[test]
    fn test_token_precedence() {
        let config = BackupConfig {
            api_token: Some("from_file".to_string()),
            output_dir: None,
        };

        assert_eq!(
            resolve_token_from(Some("from_flag"), Some("from_env".to_string()), &config),
            Some("from_flag".to_string())
        );
        assert_eq!(
            resolve_token_from(None, Some("from_env".to_string()), &config),
            Some("from_env".to_string())
        );
        assert_eq!(
            resolve_token_from(None, None, &config),
            Some("from_file".to_string())
        );
        assert_eq!(
            resolve_token_from(None, None, &BackupConfig::default()),
            None
        );
    }

    #[test]
    fn test_empty_token_falls_through() {
        assert_eq!(
            resolve_token_from(Some(""), Some("from_env".to_string()), &BackupConfig::default()),
            Some("from_env".to_string())
        );
        assert_eq!(
            resolve_token_from(Some(""), None, &BackupConfig::default()),
            None
        );
    }
}
