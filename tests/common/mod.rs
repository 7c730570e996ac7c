//! Common test utilities for integration tests.
//!
//! Builders for stream bodies in the wire format of the chat endpoint, a
//! wiremock-backed server pre-wired for the client, and a hand-rolled
//! server for bodies that must arrive slowly.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use difychat::adapters::ReqwestHttpClient;
use difychat::client::DifyClient;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "app-test-key";
pub const API_PREFIX: &str = "/v1";
pub const CHAT_PATH: &str = "/v1/chat-messages";

/// A `message` frame carrying one fragment.
pub fn message(answer: &str) -> Value {
    json!({"event": "message", "answer": answer})
}

/// A `message` frame with conversation and message ids.
pub fn message_with_ids(answer: &str, conversation_id: &str, message_id: &str) -> Value {
    json!({
        "event": "message",
        "answer": answer,
        "conversation_id": conversation_id,
        "message_id": message_id
    })
}

pub fn message_end(conversation_id: &str, message_id: &str) -> Value {
    json!({
        "event": "message_end",
        "conversation_id": conversation_id,
        "message_id": message_id
    })
}

pub fn workflow_finished(answer: &str) -> Value {
    json!({"event": "workflow_finished", "data": {"outputs": {"answer": answer}}})
}

/// Serialize frames as `data:` lines, blank-line separated, with an
/// optional `[DONE]` sentinel.
pub fn sse_body(frames: &[Value], done: bool) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(&frame.to_string());
        body.push_str("\n\n");
    }
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

/// Mock server plus a real reqwest-backed client pointed at it.
pub struct TestServer {
    pub server: MockServer,
    pub client: DifyClient,
}

impl TestServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let api_url = format!("{}{}", server.uri(), API_PREFIX);
        let client = DifyClient::new(Arc::new(ReqwestHttpClient::new()), &api_url, API_KEY);
        Self { server, client }
    }

    /// Answer streaming requests with `body`, expecting `calls` of them.
    pub async fn mount_stream(&self, body: String, calls: u64) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(header("Authorization", format!("Bearer {}", API_KEY).as_str()))
            .and(body_partial_json(json!({"response_mode": "streaming"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Answer blocking requests with `body`, expecting `calls` of them.
    pub async fn mount_blocking(&self, body: Value, calls: u64) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_partial_json(json!({"response_mode": "blocking"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }
}

/// Serve one streaming response by hand: each of `lines` is written after
/// waiting `every`, then the connection stays open for `hold` before
/// closing. Returns the API base URL.
pub async fn spawn_trickling_server(
    lines: Vec<String>,
    every: Duration,
    hold: Duration,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "Connection: close\r\n\r\n"
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for line in lines {
            tokio::time::sleep(every).await;
            if socket.write_all(line.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
        tokio::time::sleep(hold).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}{}", addr, API_PREFIX)
}

/// Consume request head and body so closing the socket does not reset it.
async fn read_request(socket: &mut TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&buf[..n]);

        let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= head_end + 4 + body_len {
            return;
        }
    }
}
