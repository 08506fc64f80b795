//! Incremental line decoder for event-stream bodies
//!
//! Network chunks rarely line up with event boundaries: one chunk may hold
//! several lines, half a line, or nothing. The decoder buffers the trailing
//! fragment and emits only complete lines, so the output is the same for
//! any chunking of the same bytes.

use crate::errors::{ClientError, Result};
use std::str::Utf8Error;

/// Maximum size of a single pending line (1MB)
pub const MAX_LINE_SIZE: usize = 1_048_576;

/// Prefix marking a data-bearing event line
pub const DATA_MARKER: &str = "data:";

/// One complete line of the body with its terminator stripped.
///
/// Kept as bytes until inspected so an invalid line can be skipped without
/// affecting its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(Vec<u8>);

impl RawLine {
    pub fn as_str(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Return the trimmed payload of a `data:` line.
///
/// Other SSE fields, comments, blank lines and whitespace-only payloads
/// yield `None`.
pub fn extract_event(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(DATA_MARKER)?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

/// Lines completed by one chunk
#[derive(Debug, Default)]
pub struct DecodedLines {
    pub lines: Vec<RawLine>,

    /// Set when a line outgrew the limit; nothing after it was decoded
    pub overflow: Option<ClientError>,
}

/// Line-buffering decoder
#[derive(Debug)]
pub struct EventLineDecoder {
    /// Bytes of the incomplete trailing line
    pending: Vec<u8>,

    /// Maximum pending line size
    max_line_size: usize,
}

impl EventLineDecoder {
    /// Create new decoder with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_SIZE)
    }

    /// Create decoder with custom maximum line size
    pub fn with_capacity(max_line_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(4096),
            max_line_size,
        }
    }

    /// Append a chunk and return every line it completes, in order.
    ///
    /// Lines end at `\n`; a `\r` directly before it is dropped as well.
    /// A line longer than the limit stops decoding: lines completed before
    /// it are still returned, alongside the overflow error. The outcome does
    /// not depend on where chunk boundaries fall.
    pub fn feed(&mut self, chunk: &[u8]) -> DecodedLines {
        let mut decoded = DecodedLines::default();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            if let Err(e) = self.check_size(self.pending.len() + pos) {
                decoded.overflow = Some(e);
                return decoded;
            }
            self.pending.extend_from_slice(&rest[..pos]);
            decoded.lines.push(self.take_line());
            rest = &rest[pos + 1..];
        }

        if let Err(e) = self.check_size(self.pending.len() + rest.len()) {
            decoded.overflow = Some(e);
            return decoded;
        }
        self.pending.extend_from_slice(rest);

        decoded
    }

    /// Flush the unterminated remainder at end of stream.
    ///
    /// A final line without newline is still a line and must not be lost.
    pub fn finish(&mut self) -> Option<RawLine> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.take_line())
    }

    /// Get current pending size
    pub fn pending_size(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn check_size(&mut self, size: usize) -> Result<()> {
        if size > self.max_line_size {
            self.pending.clear();
            return Err(ClientError::Protocol(format!(
                "Line overflow: {} byte line exceeds maximum {}",
                size, self.max_line_size
            )));
        }
        Ok(())
    }

    fn take_line(&mut self) -> RawLine {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        RawLine(line)
    }
}

impl Default for EventLineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
