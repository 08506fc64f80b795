//! tokenpipe - streaming token client for text-generation servers
//!
//! Opens an HTTP POST to a server-sent-event endpoint, decodes the body into
//! token events, and retries failed attempts with bounded exponential backoff.
//!
//! # Architecture
//!
//! - **streaming**: transport seam, line decoder, event parser, single attempt
//! - **generation**: retry policy and the retrying token stream
//! - **telemetry**: injectable event collector forwarding to `tracing`
//! - **cli** / **repl**: configuration, argument parsing and the prompt loop

pub mod errors;
pub mod types;
pub mod streaming;
pub mod generation;
pub mod telemetry;
pub mod info;
pub mod cli;
pub mod repl;

// Re-export commonly used types
pub use errors::{ClientError, Result};
pub use generation::{GenerationReport, RetryPolicy, RetryingGenerator, TokenStream};
pub use streaming::{HttpTransport, Transport};
pub use types::{GenerationRequest, StreamOutcome};
