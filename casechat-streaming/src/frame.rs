//! Line framing for the streamed response body.
//!
//! The body is a sequence of `data: <json>\n` records. Chunks arrive at
//! arbitrary byte boundaries, including in the middle of a multibyte
//! character or in the middle of a line, so decoding happens in two
//! incremental stages: bytes to text, then text to complete lines.

use crate::error::{StreamError, StreamResult};

/// Prefix that marks a line as an event record.
pub const EVENT_PREFIX: &str = "data: ";

/// Default cap on the bytes held while waiting for a line break.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// A complete line taken from the stream.
///
/// A frame is only created once its terminating newline has been seen; it
/// never holds a partial line. The raw line includes the event prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: String,
}

impl Frame {
    /// Create a frame from a complete line (without its newline).
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw line.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The line with `prefix` removed, if it starts with it.
    #[must_use]
    pub fn payload(&self, prefix: &str) -> Option<&str> {
        self.raw.strip_prefix(prefix)
    }
}

/// Incremental UTF-8 decoder.
///
/// Bytes of a character split across chunks are held back until the rest
/// of the character arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (after any held-back bytes) as is complete.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete character at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End of input: return whatever is held back, lossily decoded.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(rest)
    }
}

/// Turns an arbitrarily chunked body into complete event frames.
///
/// Each `feed` appends to a carry buffer, emits every completed line that
/// starts with the event prefix, and keeps the unterminated tail for the
/// next call. Lines without the prefix (blank keep-alives, comments) are
/// dropped here and never reach the parser.
#[derive(Debug)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    carry: String,
    prefix: String,
    max_buffer_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder using the standard `data: ` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            utf8: Utf8Decoder::new(),
            carry: String::new(),
            prefix: EVENT_PREFIX.to_string(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// Set the event prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the maximum size of the carry buffer.
    #[must_use]
    pub fn with_max_buffer_size(mut self, max: usize) -> Self {
        self.max_buffer_size = max;
        self
    }

    /// The event prefix this decoder filters on.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Feed raw bytes from the body.
    pub fn feed(&mut self, chunk: &[u8]) -> StreamResult<Vec<Frame>> {
        let text = self.utf8.decode(chunk);
        self.feed_str(&text)
    }

    /// Feed already-decoded text.
    pub fn feed_str(&mut self, chunk: &str) -> StreamResult<Vec<Frame>> {
        // The carry never holds a newline, so only the new text is searched.
        let searched_from = self.carry.len();
        self.carry.push_str(chunk);

        let Some(last_newline) = self.carry[searched_from..]
            .rfind('\n')
            .map(|i| searched_from + i)
        else {
            if self.carry.len() > self.max_buffer_size {
                return Err(StreamError::BufferOverflow {
                    limit: self.max_buffer_size,
                });
            }
            return Ok(Vec::new());
        };

        let tail = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, tail);

        let frames = complete[..last_newline]
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| {
                let keep = line.starts_with(self.prefix.as_str());
                if !keep && !line.is_empty() {
                    tracing::debug!(line = %line, "Dropping non-event line");
                }
                keep
            })
            .map(Frame::new)
            .collect();

        if self.carry.len() > self.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }

        Ok(frames)
    }

    /// Signal end of data.
    ///
    /// An unterminated trailing fragment is never emitted as a frame; it is
    /// returned here only so the caller can log it. The decoder is empty
    /// afterwards.
    pub fn flush(&mut self) -> Option<String> {
        if let Some(rest) = self.utf8.finish() {
            self.carry.push_str(&rest);
        }
        if self.carry.is_empty() {
            return None;
        }
        let fragment = std::mem::take(&mut self.carry);
        tracing::debug!(bytes = fragment.len(), "Discarding unterminated trailing fragment");
        Some(fragment)
    }

    /// Check if there is buffered data that has not formed a line yet.
    #[must_use]
    pub fn has_incomplete(&self) -> bool {
        !self.carry.is_empty() || self.utf8.pending_len() > 0
    }
}
