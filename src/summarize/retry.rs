// src/summarize/retry.rs
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;

/// Bounded retry with a fixed pause between attempts. Stops at the first `Some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op(attempt)` (1-based) until it yields a value or attempts run out.
    /// The delay is only taken between attempts, never after the last one.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for attempt in 1..=self.max_attempts {
            if let Some(v) = op(attempt).await {
                return Some(v);
            }
            if attempt < self.max_attempts {
                debug!(attempt, delay_s = self.delay.as_secs(), "attempt failed, retrying");
                clock.sleep(self.delay).await;
            }
        }
        None
    }
}
