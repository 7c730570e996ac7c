//! Errors surfaced to callers of a chat turn.

use thiserror::Error;

use crate::traits::HttpError;

/// Failure of a chat turn.
///
/// Malformed stream frames are not represented here: they are logged and
/// skipped without failing the turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    /// Request rejected with a non-2xx status, or the network failed.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// A blocking response body that could not be decoded.
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    /// Neither the stream nor the blocking fallback produced answer text.
    #[error("API returned an empty response, check the API configuration and network connection")]
    EmptyResponse,

    /// A send was attempted while another turn is still in flight.
    #[error("Please wait for the current response to complete before sending another message")]
    Busy,

    /// The turn was abandoned before it finished, e.g. its future was dropped.
    #[error("Request was cancelled before the answer completed")]
    Cancelled,

    /// Required configuration is missing or invalid.
    #[error("Missing required configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// Text shown in place of the assistant's answer when a turn fails.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Busy | ChatError::Config(_) => self.to_string(),
            _ => format!("Failed to send message: {}", self),
        }
    }

    /// HTTP status, when the failure came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Http(e) => e.status(),
            _ => None,
        }
    }
}
