//! Bounded TTL response cache keyed by task and normalized prompt

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::CacheConfig;

/// A cached payload with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: String,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Insertion-ordered, size-bounded memoization of generation results.
///
/// Entries are only ever read with `peek`, so recency never changes and the
/// least-recently-used slot is always the oldest insertion (FIFO eviction).
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    key_prefix_chars: usize,
}

impl ResponseCache {
    pub fn new(max_size: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(max_size)),
            ttl,
            key_prefix_chars: 100,
        }
    }

    /// Create a cache from configuration. A zero `max_size` is clamped to 1.
    pub fn from_config(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        let mut cache = Self::new(capacity, config.ttl());
        cache.key_prefix_chars = config.key_prefix_chars;
        cache
    }

    /// Build the key for `(task, prompt)`.
    ///
    /// The readable part keeps the first `key_prefix_chars` characters of the
    /// lowercased, trimmed prompt; the hash of the full normalized prompt keeps
    /// prompts that share a long template prefix apart.
    pub fn key(&self, task: &str, prompt: &str) -> String {
        let normalized = prompt.trim().to_lowercase();
        let prefix: String = normalized.chars().take(self.key_prefix_chars).collect();

        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);

        format!("{}:{}:{:016x}", task, prefix, hasher.finish())
    }

    /// Look up a fresh payload. Expired entries are removed and never served.
    pub fn get(&self, task: &str, prompt: &str) -> Option<String> {
        let key = self.key(task, prompt);
        let mut entries = self.entries.lock();
        // Read the clock under the lock so a slow acquisition cannot serve a stale entry.
        let now = Instant::now();

        let fresh = match entries.peek(&key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.payload.clone()),
            Some(_) => None,
            None => return None,
        };

        match fresh {
            Some(payload) => {
                debug!(task = %task, "Cache hit");
                Some(payload)
            }
            None => {
                entries.pop(&key);
                debug!(task = %task, "Cache entry expired");
                None
            }
        }
    }

    /// Store a payload, evicting the oldest insertion when full
    pub fn put(&self, task: &str, prompt: &str, payload: impl Into<String>) {
        let key = self.key(task, prompt);
        let entry = CacheEntry {
            payload: payload.into(),
            inserted_at: Instant::now(),
        };

        let mut entries = self.entries.lock();
        // Re-inserting a key counts as a fresh insertion.
        entries.pop(&key);
        if let Some((evicted, _)) = entries.push(key, entry) {
            debug!(key = %evicted, "Evicted oldest cache entry");
        }
    }

    /// Remove every expired entry and return how many were dropped
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), remaining = entries.len(), "Swept expired cache entries");
        }
        expired.len()
    }

    pub fn contains(&self, task: &str, prompt: &str) -> bool {
        let key = self.key(task, prompt);
        self.entries.lock().contains(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
