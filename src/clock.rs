// src/clock.rs
//! Time source for the pipeline: wall-clock `now` plus an awaitable sleep.
//! The scheduler and the retry policy only ever wait through this trait, so tests can
//! drive whole cycles without real delays.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, dur: Duration);
}

/// Real clock backed by `chrono::Utc` and `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// Deterministic clock for tests: `sleep` returns immediately, records the requested
/// duration and advances `now` by it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = t;
    }

    /// All durations passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock mutex poisoned").clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    async fn sleep(&self, dur: Duration) {
        self.sleeps
            .lock()
            .expect("clock mutex poisoned")
            .push(dur);
        let step = chrono::Duration::from_std(dur).unwrap_or_else(|_| chrono::Duration::zero());
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += step;
    }
}
