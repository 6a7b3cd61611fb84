//! Client error types

use thiserror::Error;

/// Errors surfaced by [`crate::ApiClient`]
///
/// `Clone` so a single refresh failure can be handed to every request that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The session could not be renewed; the user must log in again
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The refresh in progress was abandoned before it finished
    #[error("Token refresh was interrupted")]
    RefreshAbandoned,

    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status, for errors that carry one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Token persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt token file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
