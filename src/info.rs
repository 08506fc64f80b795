//! Metadata lookups against the generation server
//!
//! One-shot GETs for the API version and the loaded model name. Failures
//! are returned to the caller as-is; there is no retry here.

use crate::errors::{ClientError, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// API version endpoint
pub const VERSION_PATH: &str = "/api/v1/info/version";

/// Loaded model endpoint
pub const MODEL_PATH: &str = "/api/v1/model";

/// Response body of both metadata endpoints
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct InfoResponse {
    #[serde(default)]
    pub result: Option<String>,
}

/// Scheme and authority of a URL, without path or query.
///
/// `http://host:5001/api/extra/generate/stream` becomes `http://host:5001`.
pub fn base_url(url: &str) -> Result<String> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// HTTP client for metadata endpoints
pub struct InfoFetcher {
    client: Client,
    base_url: String,
}

impl InfoFetcher {
    /// Create a fetcher for the server hosting `endpoint`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url(endpoint)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the API version
    pub async fn version(&self) -> Result<InfoResponse> {
        self.fetch(VERSION_PATH).await
    }

    /// Query the loaded model name
    pub async fn model(&self) -> Result<InfoResponse> {
        self.fetch(MODEL_PATH).await
    }

    /// GET `path` relative to the base URL and decode `{result}`
    pub async fn fetch(&self, path: &str) -> Result<InfoResponse> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "Failed to fetch info from {}: {} - {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(ClientError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response
            .json::<InfoResponse>()
            .await
            .map_err(ClientError::from_reqwest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_path() {
        assert_eq!(
            base_url("http://172.20.10.6:5001/api/extra/generate/stream").unwrap(),
            "http://172.20.10.6:5001"
        );
    }

    #[test]
    fn test_base_url_without_port() {
        assert_eq!(
            base_url("https://example.com/api/stream?x=1").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_base_url_default_port_is_dropped() {
        assert_eq!(base_url("http://example.com:80/a").unwrap(), "http://example.com");
    }

    #[test]
    fn test_base_url_invalid() {
        assert!(matches!(base_url("nonsense"), Err(ClientError::InvalidUrl { .. })));
        assert!(matches!(
            base_url("unix:/tmp/socket"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_info_response_decoding() {
        let info: InfoResponse =
            serde_json::from_str(r#"{"result":"1.2.0","extra":true}"#).unwrap();
        assert_eq!(info.result.as_deref(), Some("1.2.0"));

        let info: InfoResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(info.result, None);
    }

    #[test]
    fn test_fetcher_base_url() {
        let fetcher = InfoFetcher::new(
            "http://localhost:5001/api/extra/generate/stream",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(fetcher.base_url(), "http://localhost:5001");
    }
}
