//! Generation request payload
//!
//! Serialized as the JSON body of the streaming POST:
//! `{"prompt": ..., "temperature": ..., "top_p": ...}`

use crate::errors::{ClientError, Result};
use serde::Serialize;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default nucleus sampling threshold
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Prompt plus sampling parameters for one logical generation.
///
/// Fields are private so a request cannot change between retry attempts.
/// Range checks are left to the remote service; only finiteness is
/// enforced here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    temperature: f64,
    top_p: f64,
}

impl GenerationRequest {
    /// Create a request with default sampling parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    /// Create a request with explicit sampling parameters
    pub fn with_sampling(prompt: impl Into<String>, temperature: f64, top_p: f64) -> Result<Self> {
        if !temperature.is_finite() {
            return Err(ClientError::ConfigError(format!(
                "temperature must be finite, got {}",
                temperature
            )));
        }
        if !top_p.is_finite() {
            return Err(ClientError::ConfigError(format!(
                "top_p must be finite, got {}",
                top_p
            )));
        }

        Ok(Self {
            prompt: prompt.into(),
            temperature,
            top_p,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }
}
