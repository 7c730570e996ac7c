//! In-memory conversation state.
//!
//! Messages are kept in display order. During a turn the assistant message
//! moves through [`TurnPhase`]: created empty (`Pending`), grown by
//! fragments (`Streaming`), relabelled with the server's id
//! (`Finalizing`), then `Done`. A failure at any point before finalizing
//! jumps straight to `Done` with an error marker as content.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ChatError;
use crate::models::ChatResponse;

/// Prefix of the content shown when a turn fails.
pub const ERROR_MARKER: &str = "❌";

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Local id until the server assigns its own
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            created_at: Utc::now(),
        }
    }

    /// Whether this message holds a turn failure instead of an answer.
    pub fn is_error(&self) -> bool {
        self.content.starts_with(ERROR_MARKER)
    }
}

/// Lifecycle of the assistant message of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    Pending,
    Streaming,
    Finalizing,
    #[default]
    Done,
}

/// One conversation session. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    busy: bool,
    phase: TurnPhase,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-assigned conversation id, once the first turn supplied one.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Record the user's query and open an empty assistant message.
    ///
    /// Returns the assistant message id, or [`ChatError::Busy`] while a
    /// previous turn is still in flight.
    pub fn begin_turn(&mut self, query: &str) -> Result<String, ChatError> {
        if self.busy {
            return Err(ChatError::Busy);
        }

        self.messages.push(Message::new(MessageRole::User, query));
        let assistant = Message::new(MessageRole::Assistant, String::new());
        let id = assistant.id.clone();
        self.messages.push(assistant);

        self.busy = true;
        self.phase = TurnPhase::Pending;
        Ok(id)
    }

    /// Append `text` to the message with `id`. No-op for unknown ids.
    pub fn append_fragment(&mut self, id: &str, text: &str) {
        let Some(message) = self.message_mut(id) else {
            tracing::debug!(message_id = id, "Fragment for unknown message dropped");
            return;
        };
        message.content.push_str(text);
        if self.phase == TurnPhase::Pending {
            self.phase = TurnPhase::Streaming;
        }
    }

    /// Relabel message `id` as `new_id`, keeping content and position.
    ///
    /// No-op for unknown ids or an empty `new_id`, so repeating the call is
    /// harmless.
    pub fn finalize(&mut self, id: &str, new_id: &str) {
        if new_id.is_empty() {
            return;
        }
        if let Some(message) = self.message_mut(id) {
            message.id = new_id.to_string();
        }
    }

    /// Close a successful turn with the server's final response.
    pub fn complete_turn(&mut self, id: &str, response: &ChatResponse) {
        self.phase = TurnPhase::Finalizing;

        if let Some(message) = self.message_mut(id) {
            if message.content.is_empty() && !response.answer.is_empty() {
                message.content = response.answer.clone();
            }
        }
        if !response.conversation_id.is_empty() {
            self.conversation_id = Some(response.conversation_id.clone());
        }
        self.finalize(id, &response.message_id);

        self.busy = false;
        self.phase = TurnPhase::Done;
    }

    /// Close a failed turn, replacing the assistant content with the error.
    pub fn fail_turn(&mut self, id: &str, error: &ChatError) {
        if let Some(message) = self.message_mut(id) {
            message.content = format!("{} {}", ERROR_MARKER, error.user_message());
        }
        self.busy = false;
        self.phase = TurnPhase::Done;
    }

    /// Forget the conversation and start over. Refused while busy.
    pub fn reset(&mut self) -> Result<(), ChatError> {
        if self.busy {
            return Err(ChatError::Busy);
        }
        *self = Self::default();
        Ok(())
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}
