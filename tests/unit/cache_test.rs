//! Unit tests for the response cache

use completion_gateway::config::CacheConfig;
use completion_gateway::middleware::ResponseCache;
use std::num::NonZeroUsize;
use std::time::Duration;

fn cache(max: usize, ttl_secs: u64) -> ResponseCache {
    ResponseCache::new(NonZeroUsize::new(max).unwrap(), Duration::from_secs(ttl_secs))
}

#[tokio::test(start_paused = true)]
async fn test_get_returns_stored_payload() {
    let cache = cache(4, 60);
    cache.put("summary", "Explain gravity", "Gravity pulls.");

    assert_eq!(cache.get("summary", "Explain gravity").as_deref(), Some("Gravity pulls."));
    assert_eq!(cache.get("summary", "  EXPLAIN GRAVITY ").as_deref(), Some("Gravity pulls."));
    assert_eq!(cache.get("quiz", "Explain gravity"), None);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_evicts_first_inserted() {
    let cache = cache(3, 60);
    for i in 0..4 {
        cache.put("task", &format!("prompt {}", i), format!("payload {}", i));
    }

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains("task", "prompt 0"));
    for i in 1..4 {
        assert!(cache.contains("task", &format!("prompt {}", i)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_reads_do_not_change_eviction_order() {
    let cache = cache(2, 60);
    cache.put("t", "first", "1");
    cache.put("t", "second", "2");

    // A read of the oldest entry must not protect it from eviction.
    assert!(cache.get("t", "first").is_some());
    cache.put("t", "third", "3");

    assert!(!cache.contains("t", "first"));
    assert!(cache.contains("t", "second"));
    assert!(cache.contains("t", "third"));
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_at_ttl() {
    let cache = cache(4, 10);
    cache.put("t", "p", "payload");

    tokio::time::advance(Duration::from_millis(9_999)).await;
    assert!(cache.get("t", "p").is_some());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cache.get("t", "p"), None);
    // Expired entries are dropped on lookup.
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_removes_only_expired() {
    let cache = cache(4, 10);
    cache.put("t", "old", "1");
    tokio::time::advance(Duration::from_secs(6)).await;
    cache.put("t", "new", "2");
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(cache.sweep(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains("t", "new"));
}

#[tokio::test(start_paused = true)]
async fn test_clear() {
    let cache = cache(4, 10);
    cache.put("t", "a", "1");
    cache.put("t", "b", "2");
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_from_config() {
    let config = CacheConfig {
        ttl_secs: 42,
        max_size: 7,
        key_prefix_chars: 5,
        ..CacheConfig::default()
    };
    let cache = ResponseCache::from_config(&config);

    assert_eq!(cache.ttl(), Duration::from_secs(42));
    assert!(cache.key("task", "abcdefghij").starts_with("task:abcde:"));
}

#[test]
fn test_keys_for_shared_template_prefix_differ() {
    let cache = cache(4, 60);
    let template = "You are a smart reply assistant. ".repeat(10);
    assert_ne!(
        cache.key("suggestions", &format!("{}hello", template)),
        cache.key("suggestions", &format!("{}goodbye", template))
    );
}
