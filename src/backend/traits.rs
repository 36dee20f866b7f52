//! Common traits and types for generative backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// A single generation request as seen by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt
    pub prompt: String,

    /// Task name, used for cache keys and logging
    pub task: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Whether the caller expects a structured (JSON) reply
    pub json_mode: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            task: task.into(),
            max_tokens: 150,
            temperature: 0.4,
            json_mode: false,
        }
    }

    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for generative backends.
///
/// Implementations perform exactly one request/response exchange per call and
/// classify every failure; they never retry or swallow errors.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Send `request` to the model identified by `model` and return its text
    async fn call(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, BackendError>;
}
