//! Streaming answer consumption.
//!
//! - `accumulator` - dispatches frames by event kind and builds the answer
//! - `fallback` - blocking retry when a stream carried no answer
//! - `turn` - the read loop tying decoder, parser, accumulator and fallback together

pub mod accumulator;
pub mod fallback;
mod turn;

pub use accumulator::{EventKind, StreamAccumulator};
pub use fallback::fetch_blocking_answer;
pub use turn::{turn_events, TurnEvent};
