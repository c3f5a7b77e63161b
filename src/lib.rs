// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod briefing;
pub mod clock;
pub mod config;
pub mod home;
pub mod ingest;
pub mod metrics;
pub mod scheduler;
pub mod summarize;
pub mod weather;

pub use crate::api::router;
pub use crate::briefing::{BriefingSnapshot, Orchestrator, SnapshotHandle, Sources, StatePublisher};
pub use crate::scheduler::{Scheduler, SchedulerStatus};

use anyhow::Context;

/// Shared HTTP client for every upstream. No request timeout is set on top of
/// reqwest's defaults; a hung call stalls only the current cycle.
pub fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("vm-briefing/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}
