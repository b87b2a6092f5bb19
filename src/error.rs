//! Error types for cartsync
//!
//! All modules use `CartResult<T>` as their return type.

use crate::cart::LineId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cartsync operations
pub type CartResult<T> = Result<T, CartError>;

/// All errors that can occur in cartsync
#[derive(Error, Debug)]
pub enum CartError {
    // Transport errors
    #[error("Cart API unreachable while {context}: {reason}")]
    Network { context: String, reason: String },

    #[error("Cart API timed out while {0}")]
    Timeout(String),

    #[error("Cart API returned {status} while {context}: {message}")]
    Api {
        status: u16,
        context: String,
        message: String,
    },

    #[error("Malformed response while {context}: {reason}")]
    Decode { context: String, reason: String },

    // Cart errors
    #[error("Cart line not found: {0}")]
    LineNotFound(LineId),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CartError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error with context
    pub fn network(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error with context
    pub fn decode(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Transport failures and server-side (5xx) errors are transient;
    /// everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } | Self::Timeout(_) => {
                Some("Check api.base_url, or pass --api <url>")
            }
            Self::Api { status: 401 | 403, .. } => {
                Some("Set a valid session cookie with --session or CARTSYNC_SESSION")
            }
            Self::LineNotFound(_) => Some("Run: cartsync show"),
            Self::ConfigInvalid { .. } => Some("Run: cartsync config init --force"),
            _ => None,
        }
    }
}
