//! Error types for the posture client

use serde_json::Value;
use thiserror::Error;

/// Result type alias for posture client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users when a request never reached the server
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The API error behind this error, if any
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// API-related errors
///
/// Session errors are handled by the client before they are returned (the
/// session is cleared and the user redirected); the `Err` only halts the
/// caller. Every other variant is for the caller to surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session expired. Please sign in again.")]
    SessionExpired {
        /// Raw response body
        body: Value,
    },

    #[error("{message}")]
    Http {
        status: u16,
        status_text: String,
        message: String,
        /// Raw response body
        body: Value,
    },

    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status associated with the error.
    ///
    /// Session errors always report 401; network failures report 0.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::SessionExpired { .. } => 401,
            ApiError::Http { status, .. } => *status,
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()).unwrap_or(0),
            ApiError::Network { .. }
            | ApiError::InvalidRequest(_)
            | ApiError::InvalidResponse(_) => 0,
        }
    }

    /// Raw response body, when the server answered
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::SessionExpired { body } | ApiError::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Persistent client-side storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Corrupt storage file: {0}")]
    Corrupt(String),
}
