//! Server-sent-event style stream parsing.
//!
//! The chat endpoint streams newline-delimited text where each frame line
//! looks like `data: {"event": "...", ...}` and the stream may end with
//! `data: [DONE]`.
//!
//! # Module structure
//! - `decoder` - bytes to complete lines ([`LineDecoder`])
//! - `frame` - line classification and JSON payloads ([`parse_line`], [`Frame`])

mod decoder;
mod frame;

pub use decoder::LineDecoder;
pub use frame::{parse_line, Frame, SseLine, DATA_PREFIX, DONE_SENTINEL};
