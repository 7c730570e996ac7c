//! `data: ` line recognition and frame payload parsing.

use serde_json::Value;

/// Prefix marking a line that carries a frame.
pub const DATA_PREFIX: &str = "data: ";

/// Payload value marking normal end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One parsed `data: {...}` line.
///
/// The payload is kept loosely typed: the same event kind is sent in more
/// than one shape, so fields are looked up by path rather than through a
/// fixed struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The `event` field, empty when absent or not a string
    pub event: String,
    /// The whole decoded JSON object
    pub payload: Value,
}

impl Frame {
    pub fn new(payload: Value) -> Self {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { event, payload }
    }

    /// Look up a string field by path, e.g. `["data", "outputs", "answer"]`.
    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        path.iter()
            .try_fold(&self.payload, |value, key| value.get(key))
            .and_then(Value::as_str)
    }

    /// Like [`Frame::str_at`] but treats the empty string as absent.
    pub fn non_empty_str_at(&self, path: &[&str]) -> Option<&str> {
        self.str_at(path).filter(|s| !s.is_empty())
    }
}

/// Classification of a single stream line.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Not a `data: ` line (comments, `event:` lines, blank separators)
    Ignored,
    /// A `data: ` line with nothing usable (blank or malformed payload)
    Skip,
    /// The end-of-stream sentinel
    Done,
    /// A parsed frame
    Frame(Frame),
}

/// Classify one complete line from the stream.
///
/// Malformed JSON is logged with the offending text and reported as
/// [`SseLine::Skip`]; it never ends the stream.
pub fn parse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };

    if data == DONE_SENTINEL {
        return SseLine::Done;
    }

    if data.trim().is_empty() {
        return SseLine::Skip;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(payload) => SseLine::Frame(Frame::new(payload)),
        Err(e) => {
            tracing::warn!(error = %e, raw = data, "Failed to parse stream frame");
            SseLine::Skip
        }
    }
}
