// src/scheduler.rs
//! Single background worker: Idle → Running → Idle, forever.
//! The interval is re-read from the options before every Idle period, so changing
//! `update_interval` takes effect without a restart.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::briefing::{BriefingSnapshot, Orchestrator};
use crate::clock::Clock;
use crate::config::ConfigSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Cloneable, read-only view of the worker for the status API.
#[derive(Clone, Default)]
pub struct SchedulerStatus {
    running: Arc<AtomicBool>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl SchedulerStatus {
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Published(Arc<BriefingSnapshot>),
    Failed(String),
}

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    config: Arc<dyn ConfigSource>,
    clock: Arc<dyn Clock>,
    status: SchedulerStatus,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        config: Arc<dyn ConfigSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orchestrator,
            config,
            clock,
            status: SchedulerStatus::default(),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.clone()
    }

    /// Run exactly one cycle. A panic inside the cycle is logged and reported as
    /// `Failed`; it never escapes.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.status.running.store(true, Ordering::Release);
        counter!("briefing_cycles_total").increment(1);

        // own task, so a panic inside a provider ends only this cycle
        let orchestrator = Arc::clone(&self.orchestrator);
        let joined = tokio::spawn(async move { orchestrator.run_cycle().await }).await;

        let outcome = match joined {
            Ok(snapshot) => {
                self.status.completed.fetch_add(1, Ordering::Relaxed);
                gauge!("briefing_last_success_ts").set(snapshot.generated_at.timestamp() as f64);
                CycleOutcome::Published(snapshot)
            }
            Err(join_err) => {
                error!(error = %join_err, "generation cycle panicked");
                self.status.failed.fetch_add(1, Ordering::Relaxed);
                counter!("briefing_cycle_failures_total").increment(1);
                CycleOutcome::Failed(join_err.to_string())
            }
        };

        self.status.running.store(false, Ordering::Release);
        outcome
    }

    /// Length of the coming Idle period, read fresh from the options.
    pub fn next_interval(&self) -> Duration {
        self.config.load().interval()
    }

    /// One full turn of the state machine: a cycle, then the Idle wait.
    pub async fn step(&self) -> CycleOutcome {
        let outcome = self.run_cycle().await;
        let idle = self.next_interval();
        info!(minutes = idle.as_secs() / 60, "next briefing scheduled");
        self.clock.sleep(idle).await;
        outcome
    }

    /// Never returns; the first cycle starts immediately.
    pub async fn run_forever(self) {
        loop {
            self.step().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run_forever())
    }
}
