//! Client side of the user-management slice: an HTTP client for the API, a
//! persisted session store and the profile page flow built on both.

pub mod api;
pub mod profile;
pub mod session;

use crate::utils::validation::UploadError;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `message` is the server's own message when it
    /// sent one.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidFile(#[from] UploadError),

    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// The message the server attached to a failed response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}
