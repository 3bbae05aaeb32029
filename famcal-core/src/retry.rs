//! Bounded, cancellable polling with backoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Probes after the first one.
    pub attempts: u32,
    pub delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 12,
            delay: Duration::from_millis(50),
            backoff: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Ready(T),
    Exhausted,
    Cancelled,
}

/// Call `check` until it yields a value, the retry budget runs out, or `cancel` fires.
///
/// `check` receives the zero-based attempt number. It runs once immediately
/// and up to `policy.attempts` more times, sleeping between calls.
pub async fn retry<T, F>(policy: &RetryPolicy, cancel: &CancelToken, mut check: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Option<T>,
{
    let mut delay = policy.delay;

    for attempt in 0..=policy.attempts {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        if let Some(value) = check(attempt) {
            return RetryOutcome::Ready(value);
        }

        if attempt == policy.attempts {
            break;
        }

        tokio::time::sleep(delay).await;
        delay = delay.mul_f64(policy.backoff.max(1.0));
    }

    if cancel.is_cancelled() {
        RetryOutcome::Cancelled
    } else {
        RetryOutcome::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ready_on_later_attempt() {
        let outcome = retry(&RetryPolicy::default(), &CancelToken::new(), |attempt| {
            (attempt == 3).then_some("found")
        })
        .await;
        assert_eq!(outcome, RetryOutcome::Ready("found"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_budget() {
        let mut calls = 0;
        let outcome: RetryOutcome<()> = retry(&RetryPolicy::default(), &CancelToken::new(), |_| {
            calls += 1;
            None
        })
        .await;
        assert_eq!(outcome, RetryOutcome::Exhausted);
        assert_eq!(calls, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_probing() {
        let cancel = CancelToken::new();
        let handle = cancel.clone();
        let mut calls = 0;
        let outcome: RetryOutcome<()> = retry(&RetryPolicy::default(), &cancel, |attempt| {
            calls += 1;
            if attempt == 2 {
                handle.cancel();
            }
            None
        })
        .await;
        assert_eq!(outcome, RetryOutcome::Cancelled);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_delay() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(10),
            backoff: 2.0,
        };
        let start = tokio::time::Instant::now();
        let _: RetryOutcome<()> = retry(&policy, &CancelToken::new(), |_| None).await;
        // 10 + 20 + 40
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(70));
        assert!(elapsed < Duration::from_millis(80));
    }
}
