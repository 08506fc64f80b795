//! HTTP transport for streaming generation
//!
//! Provides the `Transport` seam used by stream sessions with:
//! - HTTP/1.1 streaming via reqwest
//! - Endpoint: POST <configured URL>
//! - Per-attempt timeout covering connect and body

use crate::errors::{ClientError, Result};
use crate::types::GenerationRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::pin::Pin;
use std::time::Duration;

/// Default streaming endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5001/api/extra/generate/stream";

/// Default per-attempt timeout (60 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Incremental response body.
///
/// Dropping the value releases the underlying connection.
#[async_trait]
pub trait ByteStream: Send {
    /// Next chunk as it arrives; `None` once the body is exhausted
    async fn next_chunk(&mut self) -> Option<Result<Bytes>>;
}

/// Status line and body of one response
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub content_length: Option<u64>,
    pub body: Box<dyn ByteStream>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server announced a body of zero bytes
    pub fn has_empty_content(&self) -> bool {
        self.content_length == Some(0)
    }
}

/// Opens one streaming exchange for a request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return once the status line has arrived
    async fn open(&self, request: &GenerationRequest) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create transport with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }

    /// Create transport with custom endpoint and per-attempt timeout
    pub fn with_config(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| ClientError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpError)?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Get endpoint URL
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Get per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &GenerationRequest) -> Result<TransportResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        let content_length = response.content_length();

        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            content_length,
            body: Box::new(ResponseBody {
                inner: Box::pin(response.bytes_stream()),
            }),
        })
    }
}

/// Body of a reqwest response read chunk by chunk
struct ResponseBody {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
}

#[async_trait]
impl ByteStream for ResponseBody {
    async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        self.inner
            .next()
            .await
            .map(|chunk| chunk.map_err(ClientError::from_reqwest))
    }
}
