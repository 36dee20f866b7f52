//! Application settings and configuration management

use crate::config::prompts::PromptTemplates;
use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub prompts: PromptTemplates,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generative backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Inline credential; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Candidate model identifiers, most capable first
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Send `response_format: json_object` for structured tasks
    #[serde(default)]
    pub native_json_mode: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_base_url() -> String {
    "https://api.ai21.com/studio/v1".to_string()
}

fn default_api_key_env() -> String {
    "AI21_API_KEY".to_string()
}

fn default_candidates() -> Vec<String> {
    vec!["jamba-1.5-large".to_string(), "jamba-1.5-mini".to_string()]
}

fn default_timeout() -> u64 {
    30000
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Always respond in the exact format requested. Be concise and accurate."
        .to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.4
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            candidates: default_candidates(),
            timeout_ms: default_timeout(),
            system_prompt: default_system_prompt(),
            native_json_mode: false,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Number of normalized prompt characters kept verbatim in a key
    #[serde(default = "default_key_prefix_chars")]
    pub key_prefix_chars: usize,
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    1800
}

fn default_max_size() -> usize {
    500
}

fn default_sweep_interval() -> u64 {
    1800
}

fn default_key_prefix_chars() -> usize {
    100
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl(),
            max_size: default_max_size(),
            sweep_interval_secs: default_sweep_interval(),
            key_prefix_chars: default_key_prefix_chars(),
        }
    }
}

/// Outbound call spacing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_min_gap")]
    pub min_gap_ms: u64,
    /// Gap widening per consecutive failure (gap = min_gap * (1 + factor * failures))
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

/// One hour
const MAX_MIN_GAP_MS: u64 = 3_600_000;

fn default_min_gap() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    0.5
}

impl RateLimitConfig {
    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: default_min_gap(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// Backend selection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    #[serde(default = "default_probe_prompt")]
    pub probe_prompt: String,
}

fn default_max_failures() -> u32 {
    3
}

fn default_probe_prompt() -> String {
    "Hi".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            probe_prompt: default_probe_prompt(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::InvalidConfig("Configuration path is not valid UTF-8".to_string())
        })?;

        let config = Config::builder()
            .set_default("cache.ttl_secs", default_ttl())?
            .set_default("cache.max_size", default_max_size() as u64)?
            .set_default("rate_limit.min_gap_ms", default_min_gap())?
            .set_default("selection.max_failures", default_max_failures())?
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (prefixed with COMPLETION_GATEWAY_)
            .add_source(
                Environment::with_prefix("COMPLETION_GATEWAY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("backend.candidates"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "backend.base_url cannot be empty".to_string(),
            ));
        }
        if self.backend.candidates.is_empty() {
            return Err(AppError::InvalidConfig(
                "backend.candidates must list at least one model".to_string(),
            ));
        }
        if let Some(blank) = self.backend.candidates.iter().find(|c| c.trim().is_empty()) {
            return Err(AppError::InvalidConfig(format!(
                "backend.candidates contains a blank entry '{}'",
                blank
            )));
        }
        if self.cache.max_size == 0 {
            return Err(AppError::InvalidConfig(
                "cache.max_size must be greater than 0".to_string(),
            ));
        }
        if self.selection.max_failures == 0 {
            return Err(AppError::InvalidConfig(
                "selection.max_failures must be greater than 0".to_string(),
            ));
        }
        if self.rate_limit.min_gap_ms > MAX_MIN_GAP_MS {
            return Err(AppError::InvalidConfig(format!(
                "rate_limit.min_gap_ms must be at most {}, got {}",
                MAX_MIN_GAP_MS, self.rate_limit.min_gap_ms
            )));
        }
        if !(self.rate_limit.backoff_factor >= 0.0) {
            return Err(AppError::InvalidConfig(format!(
                "rate_limit.backoff_factor must be non-negative, got {}",
                self.rate_limit.backoff_factor
            )));
        }

        Ok(())
    }

    /// Resolve the backend credential, inline value first, then the environment
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.backend.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.backend.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::MissingCredential(self.backend.api_key_env.clone()))
    }
}
