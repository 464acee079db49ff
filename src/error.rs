// Error handling module
// Defines the failure taxonomy shared by the session and fetch layers

use thiserror::Error;

/// Errors surfaced by sign-in, renewal and page fetches
///
/// Cloneable so one renewal outcome can be handed to every caller
/// waiting on the same in-flight call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Identity/secret rejected by the authentication exchange
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No session identifier is stored
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The presented credential was rejected by the service
    #[error("Authorization expired: {0}")]
    AuthorizationExpired(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Response did not have the expected shape
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Non-authorization error status from the service
    #[error("Service error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Credential persistence failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SyncError {
    /// Whether this failure should trigger the renew-and-retry cycle
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, SyncError::AuthorizationExpired(_))
    }

    /// Map a reqwest transport error, keeping its category in the message
    pub(crate) fn from_transport(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };
        SyncError::Network(format!("{} (kind: {})", e, kind))
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

/// Result type alias for session and fetch operations
pub type Result<T> = std::result::Result<T, SyncError>;
