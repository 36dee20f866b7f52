//! Functional tests for dispatch spacing

#[path = "../common/mod.rs"]
mod common;

use common::{test_settings, timed_out, transient, ScriptedBackend, PROBE_TASK};
use completion_gateway::gateway::BackendHealth;
use completion_gateway::middleware::RateLimiter;
use completion_gateway::Gateway;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn gaps(times: &[Instant]) -> Vec<Duration> {
    let mut sorted = times.to_vec();
    sorted.sort();
    sorted.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_turns_are_spaced() {
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_millis(500),
        0.5,
        Arc::new(BackendHealth::new(3)),
    ));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.await_turn().await;
                Instant::now()
            })
        })
        .collect();

    let mut times = Vec::new();
    for handle in handles {
        times.push(handle.await.unwrap());
    }

    for gap in gaps(&times) {
        assert!(gap >= Duration::from_millis(500), "gap {:?} below minimum", gap);
    }
    assert_eq!(limiter.request_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_generations_are_spaced() {
    let backend = ScriptedBackend::replying("answer");
    let gateway = Gateway::with_client(&test_settings(), backend.clone()).unwrap();

    let prompts: Vec<String> = (0..6).map(|i| format!("question {}", i)).collect();
    join_all(prompts.iter().map(|p| gateway.generate(p, "summary", false))).await;

    assert_eq!(backend.probes().len(), 1);
    assert_eq!(backend.generations().len(), 6);
    let dispatches: Vec<Instant> = backend.calls().iter().map(|c| c.at).collect();
    for gap in gaps(&dispatches) {
        assert!(gap >= Duration::from_millis(1000), "gap {:?} below minimum", gap);
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_calls_are_spaced() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(1500), |_, request| {
        if request.task == PROBE_TASK {
            Ok("Hello".to_string())
        } else {
            Ok("answer".to_string())
        }
    });
    let gateway = Gateway::with_client(&test_settings(), backend.clone()).unwrap();

    let prompts: Vec<String> = (0..4).map(|i| format!("question {}", i)).collect();
    let results = join_all(prompts.iter().map(|p| gateway.generate(p, "summary", false))).await;

    assert!(results.iter().all(|r| r.as_deref() == Some("answer")));
    assert_eq!(backend.probes().len(), 1);
    assert_eq!(backend.generations().len(), 4);

    let dispatches: Vec<Instant> = backend.calls().iter().map(|c| c.at).collect();
    for gap in gaps(&dispatches) {
        assert!(gap >= Duration::from_millis(1000), "gap {:?} below minimum", gap);
    }
    assert_eq!(gateway.stats().request_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probes_are_spaced() {
    let backend = ScriptedBackend::new(|_, _| Err(transient()));
    let mut settings = test_settings();
    settings.backend.candidates = vec!["model-a".into(), "model-b".into(), "model-c".into()];
    let gateway = Gateway::with_client(&settings, backend.clone()).unwrap();

    assert_eq!(gateway.generate("q", "summary", false).await, None);

    let probes: Vec<Instant> = backend.probes().iter().map(|c| c.at).collect();
    assert_eq!(probes.len(), 3);
    for gap in gaps(&probes) {
        assert!(gap >= Duration::from_millis(1000), "gap {:?} below minimum", gap);
    }
}

#[tokio::test(start_paused = true)]
async fn test_gap_widens_after_failures() {
    let backend = ScriptedBackend::new(|_, request| {
        if request.task == PROBE_TASK {
            Ok("Hello".to_string())
        } else {
            Err(timed_out())
        }
    });
    let mut settings = test_settings();
    settings.selection.max_failures = 10;
    let gateway = Gateway::with_client(&settings, backend.clone()).unwrap();

    for i in 0..3 {
        gateway.generate(&format!("q{}", i), "summary", false).await;
    }

    let dispatches: Vec<Instant> = backend.generations().iter().map(|c| c.at).collect();
    let gaps = gaps(&dispatches);
    // One failure before the second call, two before the third.
    assert!(gaps[0] >= Duration::from_millis(1500));
    assert!(gaps[1] >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_reprobe_after_rate_limit_waits_widened_gap() {
    let backend = ScriptedBackend::new(|_, request| {
        if request.task == PROBE_TASK {
            Ok("Hello".to_string())
        } else {
            Err(transient())
        }
    });
    let gateway = Gateway::with_client(&test_settings(), backend.clone()).unwrap();

    gateway.generate("q0", "summary", false).await;
    gateway.generate("q1", "summary", false).await;

    let calls = backend.calls();
    let tasks: Vec<&str> = calls.iter().map(|c| c.task.as_str()).collect();
    assert_eq!(tasks, [PROBE_TASK, "summary", PROBE_TASK, "summary"]);
    assert!(calls[2].at - calls[1].at >= Duration::from_millis(1500));
    assert!(calls[3].at - calls[2].at >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_cache_hits_do_not_consume_turns() {
    let backend = ScriptedBackend::replying("answer");
    let gateway = Gateway::with_client(&test_settings(), backend.clone()).unwrap();

    gateway.generate("same", "summary", false).await;
    let start = Instant::now();
    for _ in 0..4 {
        gateway.generate("same", "summary", false).await;
    }

    assert_eq!(backend.generations().len(), 1);
    // One probe plus one generation.
    assert_eq!(gateway.stats().request_count, 2);
    assert_eq!(start.elapsed(), Duration::ZERO);
}
