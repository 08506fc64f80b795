//! Generation module
//!
//! Retry policy, backoff sleeper and the retrying generator that turns
//! several stream sessions into one token sequence.

pub mod generator;
pub mod retry;

// Re-export commonly used types
pub use generator::{
    AttemptRecord, GenerationReport, GenerationStatus, RetryingGenerator, TokenStream,
};
pub use retry::{
    RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
