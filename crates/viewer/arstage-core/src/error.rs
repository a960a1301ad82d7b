//! Error types for the coordinator.
//!
//! Every error is terminal to the operation that produced it only. None of them
//! leave the coordinator's in-memory state partially updated.

use serde::{Deserialize, Serialize};

use crate::ids::ClipKey;

/// Asset fetch/parse failure reported by the asset loader.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("failed to load asset '{path}': {cause}")]
pub struct LoadError {
    pub path: String,
    pub cause: String,
}

impl LoadError {
    pub fn new(path: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Camera or AR permission was refused by the user agent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("permission denied for {capability}")]
pub struct PermissionError {
    pub capability: String,
}

/// AR session negotiation failure, split by cause so each maps to its own message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionError {
    #[error("AR session permission denied")]
    Permission,

    #[error("immersive AR is not supported on this device")]
    Unsupported,

    #[error("AR requires a secure (https) context")]
    InsecureContext,

    #[error("AR session failed: {reason}")]
    Other { reason: String },
}

impl SessionError {
    /// Map a host-reported failure name (DOMException-style) onto a cause.
    pub fn from_host_name(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "SecurityError" if message.contains("secure") => {
                Self::InsecureContext
            }
            "NotAllowedError" => Self::Permission,
            "NotSupportedError" => Self::Unsupported,
            "SecurityError" => Self::InsecureContext,
            _ => Self::Other {
                reason: if message.is_empty() {
                    name.to_string()
                } else {
                    message.to_string()
                },
            },
        }
    }
}

/// Top-level error type for coordinator operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The clip is still loading; the caller's play request is retried.
    #[error("clip '{key}' is not ready yet")]
    ClipNotReady { key: ClipKey },

    /// The clip failed to load and will not be retried.
    #[error("clip '{key}' is unavailable: {reason}")]
    ClipUnavailable { key: ClipKey, reason: String },

    #[error("unknown clip '{key}'")]
    UnknownClip { key: ClipKey },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ViewerError {
    /// Whether the operation can succeed later without user intervention.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ClipNotReady { .. })
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Permission(_) => "permission",
            Self::Session(_) => "session",
            Self::ClipNotReady { .. } | Self::ClipUnavailable { .. } | Self::UnknownClip { .. } => {
                "clip"
            }
            Self::InvalidConfig { .. } => "config",
        }
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
