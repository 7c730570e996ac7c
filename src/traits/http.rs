//! HTTP transport seam.
//!
//! The chat endpoint is only ever POSTed to, in one of two shapes: buffered
//! (blocking mode and the fallback) or as a byte stream (streaming mode).
//! [`HttpClient`] covers exactly those two so tests can script both.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// Request headers by name.
pub type Headers = HashMap<String, String>;

/// Body of a streaming response, chunked as it arrives off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport failure, or a server that answered with a non-2xx status.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Could not reach the server
    ConnectionFailed(String),
    /// Request or body read exceeded the configured timeout
    Timeout(String),
    /// Non-2xx status, with the response text as message
    ServerError { status: u16, message: String },
    /// The connection broke while the body was being read
    Io(String),
    /// Anything else reported by the transport
    Other(String),
}

impl HttpError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "HTTP error! status: {}, message: {}", status, message)
            }
            HttpError::Io(msg) => write!(f, "Stream interrupted: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// POST transport for the chat endpoint.
///
/// # Example
///
/// ```ignore
/// use difychat::traits::{HttpClient, Headers};
///
/// async fn reachable<C: HttpClient>(client: &C, url: &str) -> bool {
///     client
///         .post(url, r#"{"query":"ping"}"#, &Headers::new())
///         .await
///         .map(|r| r.is_success())
///         .unwrap_or(false)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST and buffer the whole response.
    ///
    /// Non-2xx statuses come back as a [`Response`]; callers decide.
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// POST and hand back the body as it arrives.
    ///
    /// A non-2xx status is an [`HttpError::ServerError`] carrying the
    /// response text; no stream is opened for it.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}
