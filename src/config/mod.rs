//! Configuration loading for cartsync
//!
//! The file lives at `<config_dir>/cartsync/config.toml` unless `--config`
//! (or `CARTSYNC_CONFIG`) points elsewhere. A missing file means defaults.
//! A file that parses but holds unusable values is rejected on load, so a
//! bad base URL fails before any request is made.

pub mod schema;

pub use schema::Config;

use crate::error::{CartError, CartResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const APP_DIR: &str = "cartsync";
const CONFIG_FILE: &str = "config.toml";
const JOURNAL_FILE: &str = "journal.log";

/// Reads and writes the config file at one location
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` when given, otherwise the per-user default
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        Self {
            path: explicit.unwrap_or_else(Self::default_config_path),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self::locate(Some(path))
    }

    pub fn default_config_path() -> PathBuf {
        app_dir(dirs::config_dir()).join(CONFIG_FILE)
    }

    /// Where the sync journal is appended
    pub fn journal_path() -> PathBuf {
        app_dir(dirs::state_dir().or_else(dirs::data_local_dir)).join(JOURNAL_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and check the config; a missing file yields the defaults
    pub async fn load(&self) -> CartResult<Config> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(CartError::io(
                    format!("reading config from {}", self.path.display()),
                    e,
                ))
            }
        };

        let config: Config = toml::from_str(&content).map_err(|e| self.invalid(e.to_string()))?;
        config.validate().map_err(|reason| self.invalid(reason))?;
        Ok(config)
    }

    /// Write the config, replacing the old file in one rename
    pub async fn save(&self, config: &Config) -> CartResult<()> {
        config.validate().map_err(CartError::User)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CartError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let staged = self.path.with_extension("toml.tmp");
        let content = toml::to_string_pretty(config)?;
        fs::write(&staged, content)
            .await
            .map_err(|e| CartError::io(format!("writing config to {}", staged.display()), e))?;
        fs::rename(&staged, &self.path).await.map_err(|e| {
            CartError::io(format!("replacing config at {}", self.path.display()), e)
        })?;

        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    fn invalid(&self, reason: String) -> CartError {
        CartError::ConfigInvalid {
            path: self.path.clone(),
            reason,
        }
    }
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}
