//! Client configuration.
//!
//! Loaded from `~/.uniroad/config.toml`, overridable per-field with
//! `UNIROAD_*` environment variables. A user id is generated and saved on
//! first run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the advisory backend. The chat stream upgrades the
    /// scheme (`http` -> `ws`, `https` -> `wss`) and appends `/chat`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub user_id: String,

    /// Email sent with school-record uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    /// Bearer token for the academic endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Variant behavior: answer transport failures with a rule-based
    /// canned reply instead of the service-unavailable guidance.
    #[serde(default)]
    pub canned_fallback: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Config {
    /// Load configuration, creating a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let mut config = if path.is_file() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw)?
        } else {
            let config = Self {
                api_url: default_api_url(),
                user_id: uniroad_protocol::new_id(),
                user_email: None,
                auth_token: None,
                canned_fallback: false,
            };
            config.save()?;
            info!(
                component = "config",
                path = %path.display(),
                user_id = %config.user_id,
                "Created default config"
            );
            config
        };

        if let Ok(url) = std::env::var("UNIROAD_API_URL") {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        if let Ok(user) = std::env::var("UNIROAD_USER_ID") {
            if !user.is_empty() {
                config.user_id = user;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// WebSocket URL of the chat stream endpoint.
    pub fn chat_ws_url(&self) -> String {
        let base = self
            .api_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/chat", base.trim_end_matches('/'))
    }

    pub fn db_path(&self) -> PathBuf {
        data_dir().join("uniroad.db")
    }
}

/// Root data directory (`~/.uniroad`, or `UNIROAD_DATA_DIR`).
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("UNIROAD_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".uniroad")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> Config {
        Config {
            api_url: url.to_string(),
            user_id: "user-1".to_string(),
            user_email: None,
            auth_token: None,
            canned_fallback: false,
        }
    }

    #[test]
    fn chat_url_upgrades_plain_scheme() {
        let config = config_with_url("http://localhost:8000");
        assert_eq!(config.chat_ws_url(), "ws://localhost:8000/chat");
    }

    #[test]
    fn chat_url_upgrades_tls_scheme() {
        let config = config_with_url("https://api.uniroad.app/");
        assert_eq!(config.chat_ws_url(), "wss://api.uniroad.app/chat");
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = Config {
            api_url: "https://api.uniroad.app".to_string(),
            user_id: "user-2".to_string(),
            user_email: Some("a@b.kr".to_string()),
            auth_token: None,
            canned_fallback: true,
        };
        let raw = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&raw).expect("parse");
        assert_eq!(parsed.api_url, config.api_url);
        assert_eq!(parsed.user_email.as_deref(), Some("a@b.kr"));
        assert!(parsed.canned_fallback);
    }

    #[test]
    fn missing_optional_fields_default() {
        let parsed: Config =
            toml::from_str("api_url = \"http://x\"\nuser_id = \"u\"\n").expect("parse");
        assert!(parsed.user_email.is_none());
        assert!(!parsed.canned_fallback);
    }
}
