use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::*;

#[tokio::test(start_paused = true)]
async fn resolves_once_probe_flips() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let policy = ReadyPolicy {
        poll_interval: Duration::from_millis(50),
        max_wait: Duration::from_secs(1),
    };
    let waited = wait_until_ready("engine", policy, move || {
        c.fetch_add(1, Ordering::SeqCst) >= 3
    })
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(waited >= Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn times_out_with_engine_unavailable() {
    let policy = ReadyPolicy {
        poll_interval: Duration::from_millis(100),
        max_wait: Duration::from_millis(500),
    };
    let err = wait_until_ready("engine", policy, || false).await.unwrap_err();
    assert!(matches!(err, CityPaperError::EngineUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn oversized_wait_is_capped() {
    let policy = ReadyPolicy {
        poll_interval: Duration::from_secs(1),
        max_wait: Duration::from_secs(3600),
    };
    assert_eq!(policy.deadline(), MAX_READY_WAIT);
    let started = tokio::time::Instant::now();
    assert!(wait_until_ready("engine", policy, || false).await.is_err());
    assert!(started.elapsed() <= MAX_READY_WAIT + Duration::from_secs(1));
}

#[tokio::test]
async fn ready_immediately_probes_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    wait_until_ready("engine", ReadyPolicy::default(), move || {
        c.fetch_add(1, Ordering::SeqCst);
        true
    })
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
