//! Minimum spacing between outbound backend calls, widened by failures

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::gateway::selector::BackendHealth;

/// Upper bound on any computed gap
pub const MAX_GAP: Duration = Duration::from_secs(3600);

/// Dispatch bookkeeping guarded by the turn lock
#[derive(Debug, Default)]
struct RateState {
    last_request_at: Option<Instant>,
}

/// Serializes backend dispatches so that consecutive calls are at least
/// `min_gap * (1 + backoff_factor * consecutive_failures)` apart.
///
/// Waiters queue on a fair async mutex and hold it while they sleep, so the
/// second of two simultaneous callers measures its gap from the first one's
/// actual dispatch time.
pub struct RateLimiter {
    state: Mutex<RateState>,
    min_gap: Duration,
    backoff_factor: f64,
    health: Arc<BackendHealth>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(min_gap: Duration, backoff_factor: f64, health: Arc<BackendHealth>) -> Self {
        Self {
            state: Mutex::new(RateState::default()),
            min_gap,
            backoff_factor: backoff_factor.max(0.0),
            health,
            request_count: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig, health: Arc<BackendHealth>) -> Self {
        Self::new(config.min_gap(), config.backoff_factor, health)
    }

    /// Gap currently required between two dispatches, capped at [`MAX_GAP`]
    pub fn current_gap(&self) -> Duration {
        let failures = self.health.consecutive_failures();
        let multiplier = 1.0 + self.backoff_factor * f64::from(failures);
        Duration::try_from_secs_f64(self.min_gap.as_secs_f64() * multiplier)
            .map_or(MAX_GAP, |gap| gap.min(MAX_GAP))
    }

    /// Wait until this caller may dispatch, then stamp the dispatch time.
    ///
    /// Dropping the returned future before it completes leaves the state untouched.
    pub async fn await_turn(&self) -> Duration {
        let mut state = self.state.lock().await;
        let gap = self.current_gap();
        let mut waited = Duration::ZERO;

        if let Some(last) = state.last_request_at {
            let ready_at = last + gap;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!(wait_ms = waited.as_millis() as u64, gap_ms = gap.as_millis() as u64, "Waiting for rate limit turn");
                sleep_until(ready_at).await;
            }
        }

        state.last_request_at = Some(Instant::now());
        self.request_count.fetch_add(1, Ordering::Relaxed);
        waited
    }

    /// Number of dispatches granted so far
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub async fn reset(&self) {
        self.state.lock().await.last_request_at = None;
        self.request_count.store(0, Ordering::Relaxed);
    }
}
