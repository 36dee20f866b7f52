//! Backend selection with probe-based discovery and failure-driven reset

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backend::traits::{BackendClient, GenerationRequest};
use crate::middleware::RateLimiter;

/// Currently selected backend and its failure streak
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedBackend {
    pub id: Option<String>,
    pub consecutive_failures: u32,
}

/// Shared backend health, read by the rate limiter and written by the gateway.
///
/// `Unselected -> Selected -> Selected[failures + 1] -> ... -> Unselected` once
/// the streak reaches `max_failures`; the cycle restarts on the next probe.
/// Rate-limit errors also drop the selection right away but keep the streak,
/// so the re-probe waits the widened gap.
pub struct BackendHealth {
    state: Mutex<SelectedBackend>,
    max_failures: u32,
}

impl BackendHealth {
    pub fn new(max_failures: u32) -> Self {
        Self {
            state: Mutex::new(SelectedBackend::default()),
            max_failures: max_failures.max(1),
        }
    }

    /// Selected backend, clearing the selection first if the streak hit the threshold
    pub fn current(&self) -> Option<String> {
        let mut state = self.state.lock();
        if state.consecutive_failures >= self.max_failures {
            info!(failures = state.consecutive_failures, "Too many failures, resetting backend selection");
            *state = SelectedBackend::default();
        }
        state.id.clone()
    }

    pub fn select(&self, id: &str) {
        let mut state = self.state.lock();
        state.id = Some(id.to_string());
        state.consecutive_failures = 0;
    }

    pub fn record_success(&self) {
        self.state.lock().consecutive_failures = 0;
    }

    /// Count a failure; returns `true` when it triggered a selection reset
    pub fn record_failure(&self) -> bool {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.max_failures {
            info!(
                model = ?state.id,
                failures = state.consecutive_failures,
                "Failure threshold reached, backend selection reset"
            );
            *state = SelectedBackend::default();
            true
        } else {
            false
        }
    }

    /// Drop the selection if it still points at `id`, keeping the failure streak
    pub fn invalidate(&self, id: &str) {
        let mut state = self.state.lock();
        if state.id.as_deref() == Some(id) {
            state.id = None;
            debug!(model = %id, "Backend selection invalidated");
        }
    }

    pub fn reset(&self) {
        *self.state.lock() = SelectedBackend::default();
    }

    pub fn snapshot(&self) -> SelectedBackend {
        self.state.lock().clone()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }
}

const PROBE_MAX_TOKENS: u32 = 16;

/// Probes candidates in priority order and remembers the first that answers
pub struct ModelSelector {
    client: Arc<dyn BackendClient>,
    health: Arc<BackendHealth>,
    limiter: Arc<RateLimiter>,
    candidates: Vec<String>,
    probe: GenerationRequest,
    probing: tokio::sync::Mutex<()>,
}

impl ModelSelector {
    pub fn new(
        client: Arc<dyn BackendClient>,
        health: Arc<BackendHealth>,
        limiter: Arc<RateLimiter>,
        candidates: Vec<String>,
        probe_prompt: &str,
    ) -> Self {
        Self {
            client,
            health,
            limiter,
            candidates,
            probe: GenerationRequest::new(probe_prompt, "probe").max_tokens(PROBE_MAX_TOKENS),
            probing: tokio::sync::Mutex::new(()),
        }
    }

    /// Return the working backend, probing candidates when none is selected.
    ///
    /// No network call is made while a selection is held. Only one caller
    /// probes at a time; the others wait and reuse its selection. Each probe
    /// takes a rate limiter turn. Exhausting every candidate yields `None`
    /// and leaves the selection empty.
    pub async fn resolve(&self) -> Option<String> {
        if let Some(id) = self.health.current() {
            return Some(id);
        }

        let _probing = self.probing.lock().await;
        if let Some(id) = self.health.current() {
            debug!(model = %id, "Backend selected by a concurrent probe");
            return Some(id);
        }

        for candidate in &self.candidates {
            self.limiter.await_turn().await;
            debug!(model = %candidate, "Probing backend candidate");

            match self.client.call(candidate, &self.probe).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(model = %candidate, backend = %self.client.name(), "Selected backend");
                    self.health.select(candidate);
                    return Some(candidate.clone());
                }
                Ok(_) => {
                    warn!(model = %candidate, "Probe returned empty response");
                }
                Err(e) if e.is_transient() => {
                    warn!(model = %candidate, error = %e, "Candidate rate limited, trying next");
                }
                Err(e) => {
                    warn!(model = %candidate, error = %e, "Candidate probe failed");
                }
            }
        }

        error!(candidates = self.candidates.len(), "No working backend candidates");
        None
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}
