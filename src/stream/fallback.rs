//! Blocking retry for streams that produced no answer.

use crate::client::Endpoint;
use crate::error::ChatError;
use crate::models::{ChatRequest, ChatResponse, ResponseMode};

/// Re-issue `request` in blocking mode and return its answer.
///
/// Called at most once per turn, after a stream ended without a single
/// fragment. An empty answer is final: [`ChatError::EmptyResponse`].
pub async fn fetch_blocking_answer(
    endpoint: &Endpoint,
    request: &ChatRequest,
) -> Result<ChatResponse, ChatError> {
    tracing::info!("Stream produced no answer, retrying in blocking mode");

    let blocking = request.clone().with_mode(ResponseMode::Blocking);
    let body = endpoint.exchange(&blocking).await?;

    if body.answer.as_deref().map_or(true, str::is_empty) {
        tracing::warn!("Blocking fallback returned an empty answer");
        return Err(ChatError::EmptyResponse);
    }

    Ok(body.into_chat_response(request.conversation_id.as_deref()))
}
