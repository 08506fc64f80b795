//! Type definitions module
//!
//! Request payload and per-attempt outcome shared by the streaming and
//! generation layers.

pub mod outcome;
pub mod request;

// Re-export commonly used types
pub use outcome::StreamOutcome;
pub use request::{GenerationRequest, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
