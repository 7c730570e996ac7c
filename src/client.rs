//! Chat API client.
//!
//! Sends queries to a Dify-style `/chat-messages` endpoint in streaming mode,
//! with a blocking request as fallback when the stream carries no answer.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::StreamExt;

use crate::adapters::ReqwestHttpClient;
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::{BlockingResponse, ChatRequest, ChatResponse, ResponseMode};
use crate::stream::{turn_events, TurnEvent};
use crate::traits::{ByteStream, Headers, HttpClient};

pub const DEFAULT_API_URL: &str = "https://api.dify.ai/v1";
pub const CHAT_MESSAGES_PATH: &str = "/chat-messages";
pub const DEFAULT_USER: &str = "user";

/// Boxed sequence of events for one turn.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnEvent, ChatError>> + Send>>;

/// The chat endpoint plus the transport and credentials to reach it.
///
/// Cheap to clone; each turn holds its own copy.
#[derive(Clone)]
pub struct Endpoint {
    http: Arc<dyn HttpClient>,
    url: String,
    headers: Headers,
}

impl Endpoint {
    pub fn new(http: Arc<dyn HttpClient>, api_url: &str, api_key: &str) -> Self {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            http,
            url: format!("{}{}", api_url.trim_end_matches('/'), CHAT_MESSAGES_PATH),
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the response body of a streaming request.
    pub(crate) async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let body = encode(request)?;
        let mut headers = self.headers.clone();
        headers.insert("Accept".to_string(), "text/event-stream".to_string());

        self.http
            .post_stream(&self.url, &body, &headers)
            .await
            .map_err(|e| {
                tracing::error!("Streaming request failed: {}", e);
                ChatError::from(e)
            })
    }

    /// Send a blocking request and decode its body.
    pub(crate) async fn exchange(
        &self,
        request: &ChatRequest,
    ) -> Result<BlockingResponse, ChatError> {
        let body = encode(request)?;
        let response = self.http.post(&self.url, &body, &self.headers).await?;

        if !response.is_success() {
            let message = response.text_lossy();
            tracing::error!(status = response.status, "Blocking request failed: {}", message);
            return Err(crate::traits::HttpError::ServerError {
                status: response.status,
                message,
            }
            .into());
        }

        response
            .json::<BlockingResponse>()
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))
    }
}

fn encode(request: &ChatRequest) -> Result<String, ChatError> {
    serde_json::to_string(request).map_err(|e| ChatError::InvalidResponse(e.to_string()))
}

/// Client for the chat API.
///
/// # Example
///
/// ```ignore
/// use difychat::client::DifyClient;
/// use difychat::config::ChatConfig;
///
/// let client = DifyClient::from_config(&ChatConfig::from_env())?;
/// let response = client
///     .send_message("采购流程是什么？", None, |fragment| print!("{}", fragment))
///     .await?;
/// println!("\n[conversation {}]", response.conversation_id);
/// ```
#[derive(Clone)]
pub struct DifyClient {
    endpoint: Endpoint,
    user: String,
}

impl DifyClient {
    /// Create a client over any transport.
    pub fn new(http: Arc<dyn HttpClient>, api_url: &str, api_key: &str) -> Self {
        Self {
            endpoint: Endpoint::new(http, api_url, api_key),
            user: DEFAULT_USER.to_string(),
        }
    }

    /// Create a reqwest-backed client from configuration.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let http = ReqwestHttpClient::with_timeout(config.request_timeout)?;
        Ok(Self::new(Arc::new(http), &config.api_url, &config.api_key).with_user(&config.user))
    }

    /// Set the end-user identifier sent with every request.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint.url()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn request(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
    ) -> ChatRequest {
        ChatRequest::new(query, self.user.clone())
            .with_conversation_id(conversation_id.map(str::to_owned))
            .with_mode(mode)
    }

    /// Answer `query` as a sequence of events.
    ///
    /// The stream yields each answer fragment once, in arrival order, then a
    /// single [`TurnEvent::Completed`]. If the streamed response carried no
    /// answer, one blocking request is made and its whole answer is yielded
    /// as a single fragment.
    pub fn answer_stream(&self, query: &str, conversation_id: Option<&str>) -> TurnStream {
        let request = self.request(query, conversation_id, ResponseMode::Streaming);
        tracing::debug!(conversation_id = ?request.conversation_id, "Starting streamed turn");
        Box::pin(turn_events(self.endpoint.clone(), request))
    }

    /// Answer `query`, handing each fragment to `on_fragment` as it arrives.
    pub async fn send_message<F>(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        mut on_fragment: F,
    ) -> Result<ChatResponse, ChatError>
    where
        F: FnMut(&str),
    {
        let mut events = self.answer_stream(query, conversation_id);

        while let Some(event) = events.next().await {
            match event? {
                TurnEvent::Fragment(fragment) => on_fragment(&fragment),
                TurnEvent::Completed(response) => return Ok(response),
            }
        }

        Err(ChatError::EmptyResponse)
    }

    /// Answer `query` with a single blocking request, no streaming.
    pub async fn send_blocking(
        &self,
        query: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse, ChatError> {
        let request = self.request(query, conversation_id, ResponseMode::Blocking);
        let body = self.endpoint.exchange(&request).await?;
        Ok(body.into_chat_response(conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse, RequestKind};
    use crate::traits::{HttpError, Response};
    use bytes::Bytes;

    const API_URL: &str = "https://api.example.com/v1";
    const CHAT_URL: &str = "https://api.example.com/v1/chat-messages";

    fn client(mock: &MockHttpClient) -> DifyClient {
        DifyClient::new(Arc::new(mock.clone()), API_URL, "app-test")
    }

    fn stream_of(chunks: &[&str]) -> MockResponse {
        MockResponse::Stream(chunks.iter().map(|c| Bytes::from(c.to_string())).collect())
    }

    fn blocking(body: &str) -> MockResponse {
        MockResponse::Success(Response::new(200, Bytes::from(body.to_string())))
    }

    async fn collect(client: &DifyClient, query: &str) -> Vec<Result<TurnEvent, ChatError>> {
        client.answer_stream(query, None).collect().await
    }

    #[test]
    fn test_endpoint_url_joins_path() {
        let mock = MockHttpClient::new();
        assert_eq!(client(&mock).endpoint_url(), CHAT_URL);

        let trailing = DifyClient::new(Arc::new(mock), "https://api.example.com/v1/", "k");
        assert_eq!(trailing.endpoint_url(), CHAT_URL);
    }

    #[tokio::test]
    async fn test_message_fragments_streamed_in_order() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&[
                concat!(
                    "data: {\"event\":\"message\",\"answer\":\"采购流程包括：\",",
                    "\"conversation_id\":\"c1\",\"message_id\":\"m1\"}\n"
                ),
                "data: {\"event\":\"message\",\"answer\":\"1.需求 \"}\ndata: {\"event\":\"mess",
                "age\",\"answer\":\"2.立项 \"}\n",
                "data: {\"event\":\"message\",\"answer\":\"3.招标\"}\n",
                concat!(
                    "data: {\"event\":\"message_end\",",
                    "\"conversation_id\":\"c1\",\"message_id\":\"m1\"}\n"
                ),
                "data: [DONE]\n",
            ]),
        );

        let mut fragments = Vec::new();
        let response = client(&mock)
            .send_message("采购流程?", None, |f| fragments.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(fragments, vec!["采购流程包括：", "1.需求 ", "2.立项 ", "3.招标"]);
        assert_eq!(response.answer, "采购流程包括：1.需求 2.立项 3.招标");
        assert_eq!(response.conversation_id, "c1");
        assert_eq!(response.message_id, "m1");
        assert_eq!(mock.count(RequestKind::Blocking), 0);
    }

    #[tokio::test]
    async fn test_request_shape_and_headers() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&["data: {\"event\":\"message\",\"answer\":\"x\"}\n"]),
        );

        let client = client(&mock).with_user("alice");
        client.send_message("q", Some("c9"), |_| {}).await.unwrap();

        let request = &mock.get_requests()[0];
        assert_eq!(request.kind, RequestKind::Streaming);
        assert_eq!(request.url, CHAT_URL);
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer app-test".to_string())
        );
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        let body = request.json();
        assert_eq!(body["inputs"], serde_json::json!({}));
        assert_eq!(body["query"], "q");
        assert_eq!(body["response_mode"], "streaming");
        assert_eq!(body["conversation_id"], "c9");
        assert_eq!(body["user"], "alice");
    }

    #[tokio::test]
    async fn test_workflow_finished_only_stream() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&[
                "data: {\"event\":\"workflow_started\",\"data\":{}}\n",
                concat!(
                    "data: {\"event\":\"workflow_finished\",",
                    "\"data\":{\"outputs\":{\"answer\":\"完整答案\"}}}\n"
                ),
                "data: [DONE]\n",
            ]),
        );

        let events = collect(&client(&mock), "q").await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok(TurnEvent::Fragment("完整答案".to_string())));
        match &events[1] {
            Ok(TurnEvent::Completed(response)) => assert_eq!(response.answer, "完整答案"),
            other => panic!("Expected Completed, got {:?}", other),
        }
        assert_eq!(mock.count(RequestKind::Blocking), 0);
    }

    #[tokio::test]
    async fn test_keepalive_and_malformed_frames_skipped() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&[
                ": keep-alive\n",
                "event: ping\n",
                "data: {\"event\":\"message\",\"answer\":\n",
                "data: \n",
                "data: {\"event\":\"message\",\"answer\":\"still here\"}\n",
                "data: [DONE]\n",
            ]),
        );

        let mut fragments = Vec::new();
        let response = client(&mock)
            .send_message("q", None, |f| fragments.push(f.to_string()))
            .await
            .unwrap();
        assert_eq!(fragments, vec!["still here"]);
        assert_eq!(response.answer, "still here");
    }

    #[tokio::test]
    async fn test_lines_after_sentinel_not_consumed() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&[
                "data: {\"event\":\"message\",\"answer\":\"before\"}\n",
                "data: [DONE]\n",
                "data: {\"event\":\"message\",\"answer\":\"after\"}\n",
            ]),
        );

        let response = client(&mock).send_message("q", None, |_| {}).await.unwrap();
        assert_eq!(response.answer, "before");
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_processed_on_close() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&["data: {\"event\":\"message\",\"answer\":\"tail\"}"]),
        );

        let response = client(&mock).send_message("q", None, |_| {}).await.unwrap();
        assert_eq!(response.answer, "tail");
    }

    #[tokio::test]
    async fn test_empty_stream_falls_back_once() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(CHAT_URL, stream_of(&["data: [DONE]\n"]));
        mock.set_response(
            CHAT_URL,
            blocking(r#"{"answer":"阻塞回答","conversation_id":"c1","message_id":"m1"}"#),
        );

        let events = collect(&client(&mock), "q").await;
        assert_eq!(
            events,
            vec![
                Ok(TurnEvent::Fragment("阻塞回答".to_string())),
                Ok(TurnEvent::Completed(ChatResponse {
                    answer: "阻塞回答".to_string(),
                    conversation_id: "c1".to_string(),
                    message_id: "m1".to_string(),
                })),
            ]
        );
        assert_eq!(mock.count(RequestKind::Streaming), 1);
        assert_eq!(mock.count(RequestKind::Blocking), 1);
    }

    #[tokio::test]
    async fn test_empty_fallback_fails_turn() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(CHAT_URL, stream_of(&["data: [DONE]\n"]));
        mock.set_response(
            CHAT_URL,
            blocking(r#"{"answer":"","conversation_id":"c1","message_id":"m1"}"#),
        );

        let mut fragments = 0;
        let result = client(&mock).send_message("q", None, |_| fragments += 1).await;
        assert_eq!(result, Err(ChatError::EmptyResponse));
        assert_eq!(fragments, 0);
        assert_eq!(mock.count(RequestKind::Blocking), 1);
    }

    #[tokio::test]
    async fn test_closed_stream_without_sentinel_falls_back() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            stream_of(&["data: {\"event\":\"message_end\",\"conversation_id\":\"c1\"}\n"]),
        );
        mock.set_response(CHAT_URL, blocking(r#"{"answer":"ok"}"#));

        let response = client(&mock).send_message("q", None, |_| {}).await.unwrap();
        assert_eq!(response.answer, "ok");
    }

    #[tokio::test]
    async fn test_http_error_status_surfaces() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            MockResponse::Error(HttpError::ServerError {
                status: 401,
                message: "{\"code\":\"unauthorized\"}".to_string(),
            }),
        );

        let result = client(&mock).send_message("q", None, |_| {}).await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(mock.count(RequestKind::Blocking), 0);
    }

    #[tokio::test]
    async fn test_network_failure_mid_stream_surfaces_without_fallback() {
        let mock = MockHttpClient::new();
        mock.set_stream_response(
            CHAT_URL,
            MockResponse::BrokenStream {
                chunks: vec![Bytes::from("data: {\"event\":\"message\",\"answer\":\"part\"}\n")],
                error: HttpError::Io("connection reset".to_string()),
            },
        );

        let events = collect(&client(&mock), "q").await;
        assert_eq!(events[0], Ok(TurnEvent::Fragment("part".to_string())));
        assert_eq!(
            events[1],
            Err(ChatError::Http(HttpError::Io("connection reset".to_string())))
        );
        assert_eq!(events.len(), 2);
        assert_eq!(mock.count(RequestKind::Blocking), 0);
    }

    #[tokio::test]
    async fn test_send_blocking() {
        let mock = MockHttpClient::new();
        mock.set_response(
            CHAT_URL,
            blocking(r#"{"answer":"direct","conversation_id":"c3","message_id":"m3"}"#),
        );

        let response = client(&mock).send_blocking("q", None).await.unwrap();
        assert_eq!(response.answer, "direct");
        assert_eq!(mock.get_requests()[0].json()["response_mode"], "blocking");
    }

    #[tokio::test]
    async fn test_send_blocking_error_status() {
        let mock = MockHttpClient::new();
        mock.set_response(
            CHAT_URL,
            MockResponse::Success(Response::new(500, Bytes::from("internal"))),
        );

        let err = client(&mock).send_blocking("q", None).await.unwrap_err();
        assert_eq!(
            err,
            ChatError::Http(HttpError::ServerError {
                status: 500,
                message: "internal".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_send_blocking_invalid_body() {
        let mock = MockHttpClient::new();
        mock.set_response(CHAT_URL, blocking("<html>"));

        let err = client(&mock).send_blocking("q", None).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidResponse(_)));
    }
}
