//! Application Configuration
//!
//! Loads and saves the runtime configuration from
//! `~/.bilidaily/config.json`. The file holds session credentials, so
//! it is written with mode 0600 inside a 0700 directory.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::AppConfig;

/// Config file name within the config directory.
const CONFIG_FILENAME: &str = "config.json";

/// Returns the config directory: `~/.bilidaily`.
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".bilidaily")
}

/// Returns the full path to the config file: `~/.bilidaily/config.json`.
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILENAME)
}

/// Load the config from disk.
///
/// Returns `None` if the file does not exist or cannot be parsed;
/// missing fields take their defaults through serde.
pub fn load_config() -> Option<AppConfig> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return None;
    }

    let contents = fs::read_to_string(&config_path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save the config to disk, tightening permissions since the file
/// carries session cookies.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let dir = get_config_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create config directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    #[test]
    fn test_config_path_is_under_the_config_dir() {
        let path = get_config_path();
        assert!(path.starts_with(get_config_dir()));
        assert!(path.ends_with(CONFIG_FILENAME));
    }

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "accounts": [{
                    "credentials": {
                        "dedeUserId": "10001",
                        "sessdata": "sess",
                        "biliJct": "jct"
                    }
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.accounts.len(), 1);
        assert!(config.telegram.is_none());
        assert_eq!(config.log_level, LogLevel::Info);

        let entry = &config.accounts[0];
        assert_eq!(entry.tasks.coin_count, 0);
        assert!(entry.proxy.is_none());
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "accounts": [{
                    "credentials": {
                        "dedeUserId": "10001",
                        "sessdata": "sess",
                        "biliJct": "jct"
                    },
                    "tasks": {"coinCount": 3, "selectLike": true},
                    "proxy": "127.0.0.1:8080"
                }],
                "telegram": {"botToken": "123:abc", "chatId": "42"},
                "logLevel": "debug"
            }"#,
        )
        .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let reparsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed.accounts[0].tasks.coin_count, 3);
        assert_eq!(reparsed.accounts[0].proxy.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(reparsed.log_level, LogLevel::Debug);
    }
}
