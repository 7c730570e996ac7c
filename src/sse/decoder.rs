//! Incremental byte-to-line decoding for streamed response bodies.
//!
//! Network chunks can end anywhere, including in the middle of a line or
//! in the middle of a multi-byte UTF-8 character. The decoder keeps both
//! kinds of leftover between calls.

/// Stateful decoder turning raw body chunks into complete text lines.
///
/// # Example
///
/// ```
/// use difychat::sse::LineDecoder;
///
/// let mut decoder = LineDecoder::new();
/// assert!(decoder.decode(b"data: {\"a\"").is_empty());
/// assert_eq!(decoder.decode(b":1}\ndata: "), vec!["data: {\"a\":1}".to_string()]);
/// assert_eq!(decoder.finish(), Some("data: ".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Decoded text not yet terminated by a newline
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across chunks
    partial_char: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed.
    ///
    /// Lines are returned without their `\n` (and without a trailing `\r`).
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        // The retained buffer never holds a newline, so only new text is searched.
        let scanned = self.buffer.len();
        self.partial_char.extend_from_slice(chunk);
        self.decode_partial();
        self.take_complete_lines(scanned)
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// Returns `None` when nothing was buffered.
    pub fn finish(&mut self) -> Option<String> {
        if !self.partial_char.is_empty() {
            let bytes = std::mem::take(&mut self.partial_char);
            self.buffer.push_str(&String::from_utf8_lossy(&bytes));
        }
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(strip_cr(&line).to_string())
    }

    /// Text currently held back waiting for a newline.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn decode_partial(&mut self) {
        let bytes = std::mem::take(&mut self.partial_char);
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    return;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for the next chunk.
                            self.partial_char = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn take_complete_lines(&mut self, from: usize) -> Vec<String> {
        let Some(last_newline) = self.buffer[from..].rfind('\n').map(|i| from + i) else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete[..last_newline]
            .split('\n')
            .map(|line| strip_cr(line).to_string())
            .collect()
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
