//! Gateway composition root: cache, rate limiting, selection and dispatch

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::http_backend::HttpBackendClient;
use crate::backend::traits::{BackendClient, GenerationRequest};
use crate::config::{PromptTemplates, Settings};
use crate::error::{BackendError, Result};
use crate::gateway::selector::{BackendHealth, ModelSelector};
use crate::middleware::{RateLimiter, ResponseCache};

/// Runtime counters exposed for dashboards and health endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStats {
    pub model_name: String,
    pub cache_size: usize,
    pub request_count: u64,
    pub consecutive_failures: u32,
    pub is_available: bool,
}

/// Single entry point for every text generation feature
pub struct Gateway {
    client: Arc<dyn BackendClient>,
    selector: ModelSelector,
    health: Arc<BackendHealth>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    cache_enabled: bool,
    sweep_interval: Duration,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) prompts: PromptTemplates,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
}

impl Gateway {
    /// Build a gateway talking to the configured HTTP backend.
    ///
    /// Fails only on invalid configuration or a missing credential.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let api_key = settings.api_key()?;
        let client = HttpBackendClient::new(&settings.backend, &api_key)?;
        Self::with_client(settings, Arc::new(client))
    }

    /// Build a gateway around an arbitrary backend client
    pub fn with_client(settings: &Settings, client: Arc<dyn BackendClient>) -> Result<Self> {
        settings.validate()?;

        let health = Arc::new(BackendHealth::new(settings.selection.max_failures));
        let limiter = Arc::new(RateLimiter::from_config(&settings.rate_limit, health.clone()));
        let selector = ModelSelector::new(
            client.clone(),
            health.clone(),
            limiter.clone(),
            settings.backend.candidates.clone(),
            &settings.selection.probe_prompt,
        );

        info!(
            backend = %client.name(),
            candidates = ?settings.backend.candidates,
            cache_ttl_secs = settings.cache.ttl_secs,
            cache_max_size = settings.cache.max_size,
            min_gap_ms = settings.rate_limit.min_gap_ms,
            "Completion gateway initialized"
        );

        Ok(Self {
            client,
            selector,
            health,
            limiter,
            cache: Arc::new(ResponseCache::from_config(&settings.cache)),
            cache_enabled: settings.cache.enabled,
            sweep_interval: Duration::from_secs(settings.cache.sweep_interval_secs.max(1)),
            sweep_task: Mutex::new(None),
            prompts: settings.prompts.clone(),
            max_tokens: settings.backend.max_tokens,
            temperature: settings.backend.temperature,
        })
    }

    /// Generate text for `prompt` with the configured defaults
    pub async fn generate(&self, prompt: &str, task: &str, json_mode: bool) -> Option<String> {
        let request = self.request(prompt, task).json_mode(json_mode);
        self.generate_request(&request).await
    }

    /// Generate text for a fully specified request.
    ///
    /// Returns `None` on any backend failure; errors are logged and folded into
    /// the shared health state, never returned.
    pub async fn generate_request(&self, request: &GenerationRequest) -> Option<String> {
        let span = info_span!("generate", task = %request.task, request_id = %Uuid::new_v4());
        self.dispatch(request).instrument(span).await
    }

    /// Like [`Gateway::generate_request`], abandoning the call when `cancel` fires.
    ///
    /// The in-flight request is dropped, which closes its connection. A
    /// cancelled call is neither a success nor a failure.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Option<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task = %request.task, "Generation abandoned by caller");
                None
            }
            result = self.generate_request(request) => result,
        }
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Option<String> {
        if self.cache_enabled {
            if let Some(hit) = self.cache.get(&request.task, &request.prompt) {
                return Some(hit);
            }
        }

        let Some(model) = self.selector.resolve().await else {
            warn!("No model available");
            return None;
        };

        self.limiter.await_turn().await;
        debug!(model = %model, "Dispatching to backend");

        match self.client.call(&model, request).await {
            Ok(text) => {
                self.health.record_success();
                if text.trim().is_empty() {
                    warn!(model = %model, "Backend returned empty text");
                    return None;
                }
                if self.cache_enabled {
                    self.cache.put(&request.task, &request.prompt, text.clone());
                }
                debug!(model = %model, chars = text.len(), "Generation succeeded");
                Some(text)
            }
            Err(e) if e.is_transient() => {
                self.health.record_failure();
                self.health.invalidate(&model);
                warn!(model = %model, error = %e, "Backend rate limited, backend selection cleared");
                None
            }
            Err(e @ BackendError::Transport { timed_out: true, .. }) => {
                let reset = self.health.record_failure();
                warn!(model = %model, error = %e, selection_reset = reset, "Backend timed out");
                None
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Backend request failed");
                self.health.invalidate(&model);
                None
            }
        }
    }

    pub(crate) fn request(&self, prompt: &str, task: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, task)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
    }

    /// Start the periodic sweep of expired cache entries
    pub fn start_cache_sweeper(&self) {
        let mut task = self.sweep_task.lock();
        if task.is_some() {
            return;
        }

        let cache = self.cache.clone();
        let period = self.sweep_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        }));
        info!(interval_secs = period.as_secs(), "Started cache sweep task");
    }

    /// Stop the periodic cache sweep
    pub fn stop_cache_sweeper(&self) {
        if let Some(handle) = self.sweep_task.lock().take() {
            handle.abort();
            info!("Stopped cache sweep task");
        }
    }

    pub fn stats(&self) -> GatewayStats {
        let selected = self.health.snapshot();
        GatewayStats {
            model_name: selected.id.clone().unwrap_or_else(|| "None".to_string()),
            cache_size: self.cache.len(),
            request_count: self.limiter.request_count(),
            consecutive_failures: selected.consecutive_failures,
            is_available: selected.id.is_some(),
        }
    }

    /// A backend is selected, or the failure streak is still below the threshold
    pub fn is_available(&self) -> bool {
        let selected = self.health.snapshot();
        selected.id.is_some() || selected.consecutive_failures < self.health.max_failures()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cache cleared");
    }

    /// Forget the selected backend, failure streak, cache and request counter
    pub async fn reset(&self) {
        self.health.reset();
        self.cache.clear();
        self.limiter.reset().await;
        info!("Gateway fully reset");
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn candidates(&self) -> &[String] {
        self.selector.candidates()
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_task.get_mut().take() {
            handle.abort();
        }
    }
}
