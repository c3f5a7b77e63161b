// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the cycle-level series.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// Wrap an existing handle (e.g. from a recorder that was not installed globally).
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("briefing_cycles_total", "Briefing cycles started.");
    describe_counter!(
        "briefing_cycle_failures_total",
        "Briefing cycles that panicked before publishing."
    );
    describe_counter!(
        "summarizer_attempts_total",
        "AI summarization attempts, by provider."
    );
    describe_counter!(
        "summarizer_failures_total",
        "Failed AI summarization attempts, by provider."
    );
    describe_counter!(
        "sink_publish_errors_total",
        "Failed Home Assistant entity updates."
    );
    describe_gauge!(
        "briefing_last_success_ts",
        "Unix ts of the last published briefing."
    );
    describe_histogram!("briefing_cycle_ms", "Briefing cycle duration in milliseconds.");
}
