//! Streaming module
//!
//! Transport seam, line decoder, token event parser and the single-attempt
//! stream session built on top of them.

pub mod client;
pub mod decoder;
pub mod event;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

// Re-export commonly used types
pub use client::{
    ByteStream, HttpTransport, Transport, TransportResponse, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT,
};
pub use decoder::{
    extract_event, DecodedLines, EventLineDecoder, RawLine, DATA_MARKER, MAX_LINE_SIZE,
};
pub use event::{TokenEvent, TokenEventParser};
pub use session::{SessionEvent, StreamSession};
