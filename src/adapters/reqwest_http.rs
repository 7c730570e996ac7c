//! [`HttpClient`] over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Production transport.
///
/// A timeout set with [`ReqwestHttpClient::with_timeout`] bounds connecting
/// and the whole of a blocking exchange. A streamed body is only bounded
/// per read: it may run for as long as data keeps arriving, but a silence
/// longer than the timeout ends it with [`HttpError::Timeout`].
///
/// # Example
///
/// ```ignore
/// use difychat::adapters::ReqwestHttpClient;
/// use std::time::Duration;
///
/// let client = ReqwestHttpClient::with_timeout(Duration::from_secs(120))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestHttpClient {
    /// Client without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(Self::request_error)?;
        Ok(Self {
            client,
            timeout: Some(timeout),
        })
    }

    /// Classify a failure to send or to buffer a response.
    fn request_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Classify a failure while a streamed body is being read.
    fn read_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else {
            HttpError::Io(err.to_string())
        }
    }

    fn build_post(&self, url: &str, body: &str, headers: &Headers) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(self.client.post(url).body(body.to_string()), |builder, (key, value)| {
                builder.header(key, value)
            })
    }
}

/// End `body` with [`HttpError::Timeout`] once no chunk arrives for `idle`.
pub(crate) fn with_idle_timeout(body: ByteStream, idle: Duration) -> ByteStream {
    Box::pin(stream::unfold(Some(body), move |body| async move {
        let mut body = body?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(body))),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(idle_secs = idle.as_secs_f64(), "Stream went silent");
                let err = HttpError::Timeout(format!(
                    "no data received for {:.1}s",
                    idle.as_secs_f64()
                ));
                Some((Err(err), None))
            }
        }
    }))
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let mut request = self.build_post(url, body, headers);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(Self::request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::request_error)?;
        Ok(Response::new(status, body))
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let send = self.build_post(url, body, headers).send();
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send).await.map_err(|_| {
                HttpError::Timeout(format!("no response within {:.1}s", timeout.as_secs_f64()))
            })?,
            None => send.await,
        }
        .map_err(Self::request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(Self::read_error)),
        );
        Ok(match self.timeout {
            Some(idle) => with_idle_timeout(body, idle),
            None => body,
        })
    }
}
