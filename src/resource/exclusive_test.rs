// ABOUTME: Tests for exclusive resource lock semantics.
// ABOUTME: Covers pick-up, timeout, cancellation, holder marker, and contract violations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::exclusive::{Acquire, ExclusiveResource};
use crate::agent::Shutdown;

const SHORT: Duration = Duration::from_millis(20);

#[tokio::test]
async fn test_acquire_free_resource() {
    let fork = ExclusiveResource::new("C0", 0);
    let shutdown = Shutdown::new();

    assert!(!fork.is_held());
    match fork.try_acquire(3, SHORT, &shutdown).await {
        Acquire::Acquired(guard) => {
            assert_eq!(guard.holder(), 3);
            assert_eq!(guard.resource().id(), "C0");
            assert_eq!(fork.holder(), Some(3));
            guard.release();
        }
        other => panic!("Expected Acquired, got {:?}", other),
    }
    assert_eq!(fork.holder(), None);
}

#[tokio::test]
async fn test_acquire_times_out_when_held() {
    let fork = ExclusiveResource::new("C1", 1);
    let shutdown = Shutdown::new();

    let _held = fork.try_acquire_now(0).expect("free resource");

    let start = Instant::now();
    let result = fork.try_acquire(1, SHORT, &shutdown).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Acquire::TimedOut));
    assert!(
        elapsed >= SHORT,
        "Should wait for the full timeout, waited {:?}",
        elapsed
    );
    // The failed attempt must not disturb the current holder
    assert_eq!(fork.holder(), Some(0));
}

#[tokio::test]
async fn test_acquire_succeeds_once_released_within_timeout() {
    let fork = Arc::new(ExclusiveResource::new("C2", 2));
    let shutdown = Shutdown::new();

    let (held_tx, held_rx) = tokio::sync::oneshot::channel();
    let holder = {
        let fork = fork.clone();
        tokio::spawn(async move {
            let guard = fork.try_acquire_now(0).expect("free resource");
            held_tx.send(()).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            guard.release();
        })
    };

    held_rx.await.unwrap();
    let result = fork
        .try_acquire(1, Duration::from_millis(500), &shutdown)
        .await;
    match result {
        Acquire::Acquired(guard) => assert_eq!(guard.holder(), 1),
        other => panic!("Expected Acquired, got {:?}", other),
    }
    holder.await.unwrap();
}

#[tokio::test]
async fn test_acquire_cancelled_while_waiting() {
    let fork = ExclusiveResource::new("C3", 3);
    let shutdown = Shutdown::new();
    let _held = fork.try_acquire_now(0).expect("free resource");

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();
    });

    let start = Instant::now();
    let result = fork
        .try_acquire(1, Duration::from_secs(10), &shutdown)
        .await;

    assert!(matches!(result, Acquire::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_acquire_cancelled_before_start() {
    let fork = ExclusiveResource::new("C4", 4);
    let shutdown = Shutdown::new();
    shutdown.trigger();

    // Cancellation wins even though the resource is free
    let result = fork.try_acquire(0, SHORT, &shutdown).await;
    assert!(matches!(result, Acquire::Cancelled));
    assert!(!fork.is_held());
}

#[tokio::test]
async fn test_try_acquire_now_is_exclusive() {
    let fork = ExclusiveResource::new("C0", 0);

    let first = fork.try_acquire_now(0);
    assert!(first.is_some());
    assert!(fork.try_acquire_now(1).is_none());

    drop(first);
    assert!(fork.try_acquire_now(1).is_some());
}

#[tokio::test]
async fn test_guard_dropped_on_panic_frees_resource() {
    let fork = Arc::new(ExclusiveResource::new("C0", 0));

    let task = {
        let fork = fork.clone();
        tokio::spawn(async move {
            let _guard = fork.try_acquire_now(7).expect("free resource");
            blow_up();
        })
    };

    assert!(task.await.unwrap_err().is_panic());
    assert_eq!(fork.holder(), None);
    assert!(fork.try_acquire_now(1).is_some());
}

fn blow_up() {
    panic!("agent blew up while holding a fork");
}

#[test]
#[should_panic(expected = "released resource 'C0'")]
fn test_release_with_foreign_marker_panics() {
    let fork = ExclusiveResource::new("C0", 0);
    let guard = fork.try_acquire_now(1).expect("free resource");

    // Simulate a protocol bug: someone else cleared the marker
    fork.holder.store(usize::MAX, Ordering::SeqCst);
    guard.release();
}

#[test]
fn test_display_and_debug() {
    let fork = ExclusiveResource::new("C9", 9);
    assert_eq!(fork.to_string(), "C9");
    assert_eq!(fork.index(), 9);

    let debug = format!("{:?}", fork);
    assert!(debug.contains("C9"));
    assert!(debug.contains("holder"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_holders_never_overlap() {
    let fork = Arc::new(ExclusiveResource::new("shared", 0));
    let inside = Arc::new(AtomicUsize::new(0));
    let shutdown = Shutdown::new();
    let mut handles = Vec::new();

    for agent in 0..8 {
        let fork = fork.clone();
        let inside = inside.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let mut held = 0;
            for _ in 0..20 {
                if let Acquire::Acquired(guard) = fork
                    .try_acquire(agent, Duration::from_millis(50), &shutdown)
                    .await
                {
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    assert_eq!(fork.holder(), Some(agent));
                    tokio::task::yield_now().await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    guard.release();
                    held += 1;
                }
            }
            held
        }));
    }

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap();
    }

    assert!(total > 0);
    assert!(!fork.is_held());
}
