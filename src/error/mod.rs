//! Error handling for difychat.
//!
//! Three kinds of failure exist in a chat turn:
//!
//! | Kind | Handling |
//! |------|----------|
//! | Transport (non-2xx status, network, idle stream) | [`ChatError::Http`], never retried |
//! | Frame parse (one malformed `data:` line) | logged and skipped, stream continues |
//! | Empty response (no answer from stream or fallback) | [`ChatError::EmptyResponse`] |
//! | Abandoned turn (future dropped mid-turn) | [`ChatError::Cancelled`] on the message |
//!
//! Surfaced errors end the turn; the conversation shows them in place of
//! the assistant's answer.

mod chat;

pub use chat::ChatError;
