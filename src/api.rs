// src/api.rs
//! Read-only surface: HTML status page and JSON view of the current briefing.

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::briefing::SnapshotHandle;
use crate::scheduler::{SchedulerState, SchedulerStatus};

pub const WAITING_TEXT: &str = "Waiting for first update...";
pub const NEVER_TEXT: &str = "Never";

#[derive(Clone)]
pub struct AppState {
    pub snapshots: SnapshotHandle,
    pub scheduler: SchedulerStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/api/briefing", get(briefing))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let (last_updated, text) = match state.snapshots.current() {
        Some(s) => (s.last_updated(), s.briefing_text()),
        None => (NEVER_TEXT.to_string(), WAITING_TEXT.to_string()),
    };
    Html(format!(
        "<h1>VMBriefing Status</h1>\n<p><strong>Last Updated:</strong> {}</p>\n<hr>\n<pre>{}</pre>\n",
        html_escape::encode_text(&last_updated),
        html_escape::encode_text(&text)
    ))
}

#[derive(Debug, Serialize)]
struct BriefingView {
    ready: bool,
    cycle_running: bool,
    cycles_completed: u64,
    cycles_failed: u64,
    last_updated: String,
    composed_date: Option<String>,
    news_count: usize,
    news_text: Option<String>,
    ai_summary: Option<String>,
    weather_text: Option<String>,
    temperature_text: Option<String>,
    briefing_text: String,
}

async fn briefing(State(state): State<AppState>) -> Json<BriefingView> {
    let current = state.snapshots.current();
    let sched = &state.scheduler;
    let view = match current {
        Some(s) => BriefingView {
            ready: true,
            cycle_running: sched.state() == SchedulerState::Running,
            cycles_completed: sched.cycles_completed(),
            cycles_failed: sched.cycles_failed(),
            last_updated: s.last_updated(),
            composed_date: Some(s.composed_date.clone()),
            news_count: s.news_items.len(),
            news_text: Some(s.news_text.clone()),
            ai_summary: s.ai_summary.clone(),
            weather_text: Some(s.weather_text.clone()),
            temperature_text: Some(s.avg_temp_text.clone()),
            briefing_text: s.briefing_text(),
        },
        None => BriefingView {
            ready: false,
            cycle_running: sched.state() == SchedulerState::Running,
            cycles_completed: sched.cycles_completed(),
            cycles_failed: sched.cycles_failed(),
            last_updated: NEVER_TEXT.to_string(),
            composed_date: None,
            news_count: 0,
            news_text: None,
            ai_summary: None,
            weather_text: None,
            temperature_text: None,
            briefing_text: WAITING_TEXT.to_string(),
        },
    };
    Json(view)
}
