//! Progress stream framing.
//!
//! Long-running requests report progress as a sequence of JSON documents
//! written to a plain chunked HTTP body. Documents are separated by the
//! literal delimiter [`MESSAGE_DELIMITER`]. Chunk boundaries carry no
//! meaning: a delimiter, a document, or even a UTF-8 code point may be split
//! across reads, so the decoder works on raw bytes and only decodes complete
//! frames.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Separator between two framed messages.
pub const MESSAGE_DELIMITER: &str = "\n---MESSAGE---\n";

/// Errors produced while encoding or decoding framed messages.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// A frame was not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// A frame was not valid JSON for the expected type.
    #[error("invalid message: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Serialize a message and append the delimiter.
///
/// # Errors
///
/// Returns `FramingError::InvalidJson` if the value cannot be serialized.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, FramingError> {
    let mut frame = serde_json::to_vec(message)?;
    frame.extend_from_slice(MESSAGE_DELIMITER.as_bytes());
    Ok(frame)
}

/// Incremental decoder for delimiter-framed JSON messages.
///
/// Feed body chunks with [`push`](Self::push); each complete message is
/// returned exactly once, in stream order. Call [`finish`](Self::finish) at
/// end of stream to flush a trailing message that was not followed by a
/// delimiter.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known not to start a delimiter.
    scanned: usize,
}

impl MessageDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every message it completed.
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Vec<Result<T, FramingError>> {
        self.buffer.extend_from_slice(chunk);

        let delimiter = MESSAGE_DELIMITER.as_bytes();
        let mut messages = Vec::new();
        let mut start = 0;
        let mut cursor = self.scanned;

        while let Some(offset) = find(&self.buffer[cursor..], delimiter) {
            let end = cursor + offset;
            if let Some(message) = decode_frame(&self.buffer[start..end]) {
                messages.push(message);
            }
            start = end + delimiter.len();
            cursor = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len().saturating_sub(delimiter.len() - 1);

        messages
    }

    /// Flush whatever remains in the buffer at end of stream.
    ///
    /// Returns `None` if the remainder is empty or whitespace.
    pub fn finish<T: DeserializeOwned>(&mut self) -> Option<Result<T, FramingError>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        decode_frame(&rest)
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Option<Result<T, FramingError>> {
    let text = match std::str::from_utf8(frame) {
        Ok(text) => text.trim(),
        Err(_) => return Some(Err(FramingError::InvalidUtf8)),
    };

    if text.is_empty() {
        return None;
    }

    Some(serde_json::from_str(text).map_err(FramingError::from))
}
