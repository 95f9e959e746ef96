//! Error types for Herald
//!
//! Every rejection carries a stable [`ErrorKind`] code and a human-readable
//! message. Storage and internal details are kept out of the public message.

use hyper::StatusCode;
use serde::Serialize;

use crate::store::StoreError;

/// Machine-checkable rejection kind, serialized as the `code` field of
/// error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ChallengeFailed,
    DuplicateIdentity,
    InvalidCredentials,
    InvalidInput,
    Unauthenticated,
    StorageError,
    TransportError,
    ConfigError,
    BadRequest,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChallengeFailed => "CHALLENGE_FAILED",
            Self::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::StorageError => "STORAGE_ERROR",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for Herald operations
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    #[error("Challenge verification failed")]
    ChallengeFailed,

    #[error("An account with this address already exists")]
    DuplicateIdentity,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChallengeFailed => ErrorKind::ChallengeFailed,
            Self::DuplicateIdentity => ErrorKind::DuplicateIdentity,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::Transport(_) => ErrorKind::TransportError,
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Http(_) => ErrorKind::BadRequest,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ChallengeFailed => StatusCode::FORBIDDEN,
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients.
    ///
    /// Storage, transport and internal failures are reported generically;
    /// their detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Storage unavailable".to_string(),
            Self::Transport(_) => "Upstream service unavailable".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for HeraldError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::io::Error> for HeraldError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for HeraldError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for HeraldError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
