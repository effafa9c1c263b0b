//! Line codec for Huddle.
//!
//! Frames a byte stream into lines terminated by `\n` (an optional preceding
//! `\r` is stripped), and terminates outgoing lines with `\n`. Bytes that are
//! not valid UTF-8 decode to U+FFFD instead of failing the line.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Default maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Protocol errors that can occur while framing lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Line exceeds the configured maximum.
    #[error("Line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec for newline-delimited text frames.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Bytes already scanned for `\n` without finding one.
    next_index: usize,
}

impl LineCodec {
    /// Create a codec with the default maximum line length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a specific maximum line length.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    fn take_line(
        &mut self,
        buf: &mut BytesMut,
        end: usize,
        consumed: usize,
    ) -> Result<String, ProtocolError> {
        let mut line = buf.split_to(end);
        buf.advance(consumed - end);
        self.next_index = 0;

        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        if line.len() > self.max_length {
            return Err(ProtocolError::LineTooLong(self.max_length));
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let end = self.next_index + offset;
                self.take_line(buf, end, end + 1).map(Some)
            }
            None => {
                // Allow one extra byte for a trailing `\r`.
                if buf.len() > self.max_length + 1 {
                    buf.clear();
                    self.next_index = 0;
                    return Err(ProtocolError::LineTooLong(self.max_length));
                }
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let end = buf.len();
        self.take_line(buf, end, end).map(Some)
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = line.as_ref();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
