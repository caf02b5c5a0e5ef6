// src/coordinator/poller.rs
// =============================================================================
// The Completion Poller.
//
// `poll_until` is a plain retry loop: call a check, stop when it says done,
// otherwise wait a fixed interval and try again, up to a fixed number of
// attempts. It knows nothing about crawls, so tests can drive it with any
// closure (and with paused tokio time instead of real waiting).
//
// `await_completion` plugs the store's pending() predicate into that loop.
// Giving up does not touch the crawl itself: queued messages keep being
// processed whether anyone is still waiting or not.
// =============================================================================

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PollError, TransportError};
use crate::store::PageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    // 128 attempts, 2.5 s apart: about five minutes
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2500),
            attempts: 128,
        }
    }
}

/// Runs `check` until it returns `Ok(true)` or the attempts run out
///
/// A check that errors counts as "not done yet". Returns the attempt number
/// that succeeded.
pub async fn poll_until<F, Fut>(policy: PollPolicy, mut check: F) -> Result<u32, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, TransportError>>,
{
    for attempt in 1..=policy.attempts {
        match check().await {
            Ok(true) => return Ok(attempt),
            Ok(false) => debug!(attempt, "not done yet"),
            Err(err) => warn!(attempt, error = %err, "completion check failed"),
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(PollError::Timeout {
        attempts: policy.attempts,
    })
}

/// Waits until the store reports the crawl as no longer pending
pub async fn await_completion(
    store: &dyn PageStore,
    execution_id: &str,
    limit: u64,
    policy: PollPolicy,
) -> Result<u32, PollError> {
    let attempts = poll_until(policy, || async move {
        store
            .pending(execution_id, limit)
            .await
            .map(|pending| !pending)
    })
    .await?;

    info!(%execution_id, attempts, "completion reached");
    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            attempts,
        }
    }

    #[tokio::test]
    async fn test_stops_as_soon_as_done() {
        let calls = AtomicU32::new(0);
        let result = poll_until(fast(10), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n == 3)
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_count_as_not_done() {
        let calls = AtomicU32::new(0);
        let result = poll_until(fast(5), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 2 {
                Err(TransportError::Store("flaky".to_string()))
            } else {
                Ok(true)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_times_out_after_128_attempts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = poll_until(PollPolicy::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .await;

        assert!(matches!(result, Err(PollError::Timeout { attempts: 128 })));
        assert_eq!(calls.load(Ordering::SeqCst), 128);
        // 127 waits of 2.5 s between 128 attempts
        assert!(started.elapsed() >= Duration::from_millis(2500) * 127);
    }

    #[tokio::test]
    async fn test_await_completion_reads_pending() {
        use crate::store::{MemoryStore, PageRecord};

        let store = MemoryStore::new(10);
        let page = PageRecord {
            children: 0,
            exid: "e1".to_string(),
            log_id: "local".to_string(),
            request_id: "req".to_string(),
            title: "Home".to_string(),
            url: "http://example.com".to_string(),
        };
        store.save("e1", 1, page).await.unwrap();

        let attempts = await_completion(&store, "e1", 1, fast(3)).await.unwrap();
        assert_eq!(attempts, 1);

        let timed_out = await_completion(&store, "e2", 1, fast(3)).await;
        assert!(matches!(timed_out, Err(PollError::Timeout { attempts: 3 })));
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is poll_until generic over F and Fut?
//    - An async closure is a function returning some future type
//    - Naming both lets the loop call it again on every attempt
//
// 2. What does #[tokio::test(start_paused = true)] do?
//    - Time stands still until every task is waiting on a timer
//    - Then the clock jumps ahead, so minutes of sleeping take no real time
// -----------------------------------------------------------------------------
