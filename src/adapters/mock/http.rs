//! Mock HTTP client for testing.
//!
//! Streaming and blocking POSTs are scripted separately per URL, because a
//! single chat turn can hit the same endpoint both ways (stream first, then
//! the blocking fallback).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Which `HttpClient` method a recorded request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Blocking,
    Streaming,
}

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a buffered response
    Success(Response),
    /// Fail the request before any body is read
    Error(HttpError),
    /// Return a stream yielding these chunks, then closing
    Stream(Vec<Bytes>),
    /// Return a stream yielding these chunks, then failing
    BrokenStream { chunks: Vec<Bytes>, error: HttpError },
    /// Return a stream yielding these chunks, then never ending
    Stalled(Vec<Bytes>),
}

/// Mock HTTP client for testing.
///
/// # Example
///
/// ```ignore
/// use difychat::adapters::mock::{MockHttpClient, MockResponse};
/// use bytes::Bytes;
///
/// let client = MockHttpClient::new();
/// client.set_stream_response(
///     "https://api.example.com/v1/chat-messages",
///     MockResponse::Stream(vec![Bytes::from("data: [DONE]\n")]),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    blocking: Arc<Mutex<HashMap<String, MockResponse>>>,
    streaming: Arc<Mutex<HashMap<String, MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response to a blocking POST to `url`.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.blocking
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Script the response to a streaming POST to `url`.
    pub fn set_stream_response(&self, url: &str, response: MockResponse) {
        self.streaming
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Count recorded requests of one kind.
    pub fn count(&self, kind: RequestKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    fn record_request(&self, kind: RequestKind, url: &str, headers: &Headers, body: &str) {
        self.requests.lock().unwrap().push(RecordedRequest {
            kind,
            url: url.to_string(),
            headers: headers.clone(),
            body: body.to_string(),
        });
    }

    fn lookup(map: &Mutex<HashMap<String, MockResponse>>, url: &str) -> Option<MockResponse> {
        map.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request(RequestKind::Blocking, url, headers, body);

        match Self::lookup(&self.blocking, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request(RequestKind::Streaming, url, headers, body);

        match Self::lookup(&self.streaming, url) {
            Some(MockResponse::Stream(chunks)) => {
                Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
            }
            Some(MockResponse::BrokenStream { chunks, error }) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error)));
                Ok(Box::pin(stream::iter(items)))
            }
            Some(MockResponse::Stalled(chunks)) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
