//! Per-request reconciliation of stream frames into one answer.

use crate::models::{time_derived_id, ChatResponse};
use crate::sse::Frame;

/// Event kinds the accumulator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Incremental answer text
    Message,
    /// End of the answer; carries ids only
    MessageEnd,
    /// Workflow summary; may carry the complete answer
    WorkflowFinished,
    /// Anything else (`workflow_started`, `node_finished`, `ping`, ...)
    Other,
}

impl EventKind {
    pub fn from_event(event: &str) -> Self {
        match event {
            "message" => EventKind::Message,
            "message_end" => EventKind::MessageEnd,
            "workflow_finished" => EventKind::WorkflowFinished,
            _ => EventKind::Other,
        }
    }
}

/// Pulls an answer fragment out of one payload shape.
type AnswerStrategy = fn(&Frame) -> Option<&str>;

fn top_level_answer(frame: &Frame) -> Option<&str> {
    frame.non_empty_str_at(&["answer"])
}

fn nested_data_answer(frame: &Frame) -> Option<&str> {
    frame.non_empty_str_at(&["data", "answer"])
}

/// Tried in order for `message` events; the first hit wins.
const MESSAGE_ANSWER_STRATEGIES: &[AnswerStrategy] = &[top_level_answer, nested_data_answer];

/// Path of the complete answer in a `workflow_finished` event.
const WORKFLOW_ANSWER_PATH: &[&str] = &["data", "outputs", "answer"];

/// State for one streamed answer.
///
/// Lives exactly as long as the request that feeds it.
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    full_answer: String,
    conversation_id: Option<String>,
    message_id: Option<String>,
    received_fragment: bool,
}

impl StreamAccumulator {
    /// Start accumulating for a turn in `conversation_id` (if known yet).
    pub fn new(conversation_id: Option<String>) -> Self {
        Self {
            conversation_id,
            ..Self::default()
        }
    }

    /// Apply one frame and return the fragment it contributes, if any.
    ///
    /// A returned fragment has already been appended to the full answer and
    /// is never returned again.
    pub fn apply(&mut self, frame: &Frame) -> Option<String> {
        let kind = EventKind::from_event(&frame.event);
        tracing::debug!(event = %frame.event, "Stream frame");

        match kind {
            EventKind::Message => {
                self.record_ids(frame);
                let fragment = MESSAGE_ANSWER_STRATEGIES
                    .iter()
                    .find_map(|strategy| strategy(frame))?
                    .to_string();
                self.full_answer.push_str(&fragment);
                self.received_fragment = true;
                Some(fragment)
            }
            EventKind::MessageEnd => {
                self.record_ids(frame);
                None
            }
            EventKind::WorkflowFinished => {
                if self.received_fragment {
                    return None;
                }
                let answer = frame.non_empty_str_at(WORKFLOW_ANSWER_PATH)?.to_string();
                self.full_answer = answer.clone();
                self.received_fragment = true;
                Some(answer)
            }
            EventKind::Other => None,
        }
    }

    fn record_ids(&mut self, frame: &Frame) {
        if let Some(id) = frame.non_empty_str_at(&["conversation_id"]) {
            self.conversation_id = Some(id.to_string());
        }
        if let Some(id) = frame.non_empty_str_at(&["message_id"]) {
            self.message_id = Some(id.to_string());
        }
    }

    pub fn has_received_fragment(&self) -> bool {
        self.received_fragment
    }

    pub fn full_answer(&self) -> &str {
        &self.full_answer
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Finish the turn, generating a message id if the server sent none.
    pub fn into_response(self) -> ChatResponse {
        ChatResponse {
            answer: self.full_answer,
            conversation_id: self.conversation_id.unwrap_or_default(),
            message_id: self.message_id.unwrap_or_else(time_derived_id),
        }
    }
}
