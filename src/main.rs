//! VMBriefing binary entrypoint.
//! Starts the briefing worker once and serves the status page.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vm_briefing::api::{self, AppState};
use vm_briefing::clock::{Clock, SystemClock};
use vm_briefing::config::{ConfigSource, FileConfigSource};
use vm_briefing::home::{HomeAssistantClient, StateStore};
use vm_briefing::ingest::fetcher::HttpFeedFetcher;
use vm_briefing::metrics::Metrics;
use vm_briefing::summarize::HttpSummarizerFactory;
use vm_briefing::weather::openweather::OpenWeatherMap;
use vm_briefing::{Orchestrator, Scheduler, SnapshotHandle, Sources, StatePublisher};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// `RUST_LOG` filter (default `vm_briefing=info,warn`); JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vm_briefing=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; the add-on supervisor injects SUPERVISOR_TOKEN directly.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::install()?;
    let http = vm_briefing::http_client()?;

    let config_source = FileConfigSource::from_env();
    info!(path = %config_source.path().display(), "options source");
    let config: Arc<dyn ConfigSource> = Arc::new(config_source);

    let ha = HomeAssistantClient::from_env(http.clone());
    if !ha.has_token() {
        tracing::warn!("SUPERVISOR_TOKEN not set; Home Assistant calls are disabled");
    }
    let states: Arc<dyn StateStore> = Arc::new(ha);

    let sources = Sources {
        feeds: Arc::new(HttpFeedFetcher::new(http.clone())),
        forecast: Arc::new(OpenWeatherMap::new(http.clone())),
        states: Arc::clone(&states),
        summarizers: Arc::new(HttpSummarizerFactory::new(http)),
    };

    let snapshots = SnapshotHandle::new();
    let publisher = StatePublisher::new(states, snapshots.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let orchestrator = Orchestrator::new(Arc::clone(&config), sources, publisher, Arc::clone(&clock));

    let scheduler = Scheduler::new(Arc::new(orchestrator), config, clock);
    let status = scheduler.status();
    // the worker is never joined; it lives as long as the process
    let _worker = scheduler.spawn();

    let app = api::router(AppState {
        snapshots,
        scheduler: status,
    })
    .merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "status page listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
