//! Configuration schema for cartsync
//!
//! Configuration is stored at `~/.config/cartsync/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cart API connection
    pub api: ApiConfig,

    /// Write coalescing and retry
    pub sync: SyncConfig,
}

impl Config {
    /// Check values the types alone cannot rule out
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "Invalid log format: {}. Use text or json",
                self.general.log_format
            ));
        }
        let url = self.api.base_url.as_str();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!(
                "Invalid base URL: {}. It must start with http:// or https://",
                url
            ));
        }
        if self.api.timeout_ms == 0 {
            return Err("api.timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append sync events to the journal file
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: false,
        }
    }
}

/// Cart API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://shop.example.com/api`
    pub base_url: String,

    /// Raw `Cookie` header value identifying the session
    pub session_cookie: Option<String>,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            session_cookie: None,
            timeout_ms: 10_000,
        }
    }
}

/// Sync behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a line's newest value is sent
    pub debounce_ms: u64,

    /// Retries for a transient write failure before rolling back
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            max_retries: 1,
        }
    }
}
