use bytes::{Buf, BytesMut};
use serde_json::Value;

use crate::error::{Result, StreamError};
use crate::models::RawFrame;

pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Stateful splitter for newline-delimited JSON.
///
/// Chunks may end anywhere, including inside a multi-byte character; bytes are held
/// until a `\n` completes the line.
pub struct FrameDecoder {
    buffer: BytesMut,
    /// Lines consumed so far, blank ones included
    line: u64,
    /// How much of `buffer` is already known to contain no newline
    scanned: usize,
    max_line_bytes: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            line: 0,
            scanned: 0,
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Append a transport chunk to the buffer.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        let before = self.buffer.len();
        self.buffer.extend_from_slice(chunk);
        // bytes after the last newline, i.e. the line still being assembled
        let pending = match chunk.iter().rposition(|&b| b == b'\n') {
            Some(pos) => chunk.len() - pos - 1,
            None => match self.buffer[..before].iter().rposition(|&b| b == b'\n') {
                Some(pos) => self.buffer.len() - pos - 1,
                None => self.buffer.len(),
            },
        };
        if pending > self.max_line_bytes {
            return Err(StreamError::protocol(format!(
                "frame at line {} exceeds {} bytes without a newline",
                self.line + 1,
                self.max_line_bytes
            )));
        }
        Ok(())
    }

    /// Next complete frame in the buffer, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n')
            else {
                self.scanned = self.buffer.len();
                return Ok(None);
            };
            let end = self.scanned + offset;
            let line = self.buffer.split_to(end);
            self.buffer.advance(1);
            self.scanned = 0;
            self.line += 1;

            if let Some(frame) = self.decode_line(&line)? {
                return Ok(Some(frame));
            }
        }
    }

    /// Decode whatever is left once the transport has ended.
    ///
    /// A final line without a trailing newline is still a frame.
    pub fn finish(&mut self) -> Result<Option<RawFrame>> {
        if let Some(frame) = self.next_frame()? {
            return Ok(Some(frame));
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let line = self.buffer.split();
        self.scanned = 0;
        self.line += 1;
        self.decode_line(&line)
    }

    /// Bytes held back waiting for a newline
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn lines_consumed(&self) -> u64 {
        self.line
    }

    fn decode_line(&self, raw: &[u8]) -> Result<Option<RawFrame>> {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.iter().all(u8::is_ascii_whitespace) {
            tracing::trace!(line = self.line, "Skipping blank keep-alive line");
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(line).map_err(|source| StreamError::Decode {
            line: self.line,
            source,
        })?;
        if !value.is_object() {
            return Err(StreamError::protocol(format!(
                "frame at line {} is not a JSON object",
                self.line
            )));
        }
        Ok(Some(RawFrame::new(self.line, value)))
    }

    /// Reset the decoder state, dropping any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        if self.buffer.capacity() > 65536 {
            self.buffer = BytesMut::with_capacity(8192);
        }
        self.scanned = 0;
        self.line = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
