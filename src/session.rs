//! Drives chat turns against a [`Conversation`].

use futures_util::StreamExt;

use crate::client::DifyClient;
use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::models::ChatResponse;
use crate::stream::TurnEvent;

/// A client bound to one conversation.
///
/// `ask` borrows the session mutably for the whole turn, so two turns can
/// never feed the same conversation at once.
pub struct ChatSession {
    client: DifyClient,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(client: DifyClient) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn client(&self) -> &DifyClient {
        &self.client
    }

    /// Start a new conversation.
    pub fn reset(&mut self) -> Result<(), ChatError> {
        self.conversation.reset()
    }

    /// Run one streamed turn.
    ///
    /// Each fragment is appended to the assistant message and then passed
    /// to `on_fragment`. On failure the assistant message shows the error
    /// and the error is returned. Dropping the returned future ends the
    /// turn as [`ChatError::Cancelled`].
    pub async fn ask<F>(
        &mut self,
        query: &str,
        mut on_fragment: F,
    ) -> Result<ChatResponse, ChatError>
    where
        F: FnMut(&str),
    {
        let message_id = self.conversation.begin_turn(query)?;
        let mut turn = OpenTurn::new(&mut self.conversation, message_id);
        let mut events = self.client.answer_stream(query, turn.conversation_id());

        let mut outcome = Err(ChatError::EmptyResponse);
        while let Some(event) = events.next().await {
            match event {
                Ok(TurnEvent::Fragment(fragment)) => {
                    turn.append(&fragment);
                    on_fragment(&fragment);
                }
                Ok(TurnEvent::Completed(response)) => {
                    outcome = Ok(response);
                    break;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        turn.settle(outcome)
    }

    /// Run one turn with a single blocking request.
    pub async fn ask_blocking(&mut self, query: &str) -> Result<ChatResponse, ChatError> {
        let message_id = self.conversation.begin_turn(query)?;
        let turn = OpenTurn::new(&mut self.conversation, message_id);
        let outcome = self
            .client
            .send_blocking(query, turn.conversation_id())
            .await;
        turn.settle(outcome)
    }
}

/// The assistant message of a turn in flight.
///
/// Closes the turn when dropped unsettled, so an abandoned `ask` never
/// leaves the conversation busy.
struct OpenTurn<'a> {
    conversation: &'a mut Conversation,
    message_id: String,
    settled: bool,
}

impl<'a> OpenTurn<'a> {
    fn new(conversation: &'a mut Conversation, message_id: String) -> Self {
        Self {
            conversation,
            message_id,
            settled: false,
        }
    }

    fn conversation_id(&self) -> Option<&str> {
        self.conversation.conversation_id()
    }

    fn append(&mut self, fragment: &str) {
        self.conversation.append_fragment(&self.message_id, fragment);
    }

    fn settle(
        mut self,
        outcome: Result<ChatResponse, ChatError>,
    ) -> Result<ChatResponse, ChatError> {
        match &outcome {
            Ok(response) => self.conversation.complete_turn(&self.message_id, response),
            Err(e) => {
                tracing::warn!("Turn failed: {}", e);
                self.conversation.fail_turn(&self.message_id, e);
            }
        }
        self.settled = true;
        outcome
    }
}

impl Drop for OpenTurn<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(message_id = %self.message_id, "Turn abandoned before completion");
            self.conversation
                .fail_turn(&self.message_id, &ChatError::Cancelled);
        }
    }
}
