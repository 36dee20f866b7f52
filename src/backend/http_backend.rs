//! HTTP backend client for OpenAI-compatible chat completion endpoints

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::traits::{BackendClient, GenerationRequest};
use crate::config::BackendConfig;
use crate::error::{AppError, BackendError, Result};

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    pub r#type: String,
}

/// Chat completion response envelope
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

const JSON_INSTRUCTION: &str = "Respond with valid JSON only.";

/// HTTP client for a single chat completions endpoint
pub struct HttpBackendClient {
    name: String,
    client: Client,
    completions_url: String,
    system_prompt: String,
    top_p: f32,
    native_json_mode: bool,
}

impl HttpBackendClient {
    /// Create a new HTTP backend client from configuration
    pub fn new(config: &BackendConfig, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AppError::InvalidConfig(format!("Invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: "http".to_string(),
            client,
            completions_url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            system_prompt: config.system_prompt.clone(),
            top_p: config.top_p,
            native_json_mode: config.native_json_mode,
        })
    }

    /// Build the wire request for `model`
    pub fn build_request(&self, model: &str, request: &GenerationRequest) -> ChatCompletionRequest {
        let system = if request.json_mode {
            format!("{} {}", self.system_prompt, JSON_INSTRUCTION)
        } else {
            self.system_prompt.clone()
        };

        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::new("system", system),
                ChatMessage::new("user", request.prompt.clone()),
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: self.top_p,
            n: 1,
            response_format: (request.json_mode && self.native_json_mode).then(|| ResponseFormat {
                r#type: "json_object".to_string(),
            }),
        }
    }
}

/// Classify a non-success status and its body into a [`BackendError`]
pub fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let lowered = body.to_lowercase();
    let message: String = body.chars().take(500).collect();

    if status == StatusCode::TOO_MANY_REQUESTS
        || lowered.contains("quota")
        || lowered.contains("rate limit")
    {
        BackendError::Transient {
            status: status.as_u16(),
            message,
        }
    } else {
        BackendError::Request {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<String, BackendError> {
        let body = self.build_request(model, request);

        debug!(model = %model, url = %self.completions_url, "Sending completion request");

        let response = self
            .client
            .post(&self.completions_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(model = %model, error = %e, "Connection to backend failed");
                BackendError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_status(status, &text);
            warn!(model = %model, status = %status, error = %err, "Backend returned error");
            return Err(err);
        }

        let envelope: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::from(e)
            } else {
                BackendError::Request {
                    status: status.as_u16(),
                    message: format!("Failed to parse response: {}", e),
                }
            }
        })?;

        Ok(envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
