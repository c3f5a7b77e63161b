// src/briefing/orchestrator.rs
//! One briefing cycle: news (+ summary), weather and temperature are gathered
//! concurrently, merged into a single snapshot, then published.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use metrics::{counter, histogram};
use tracing::{error, info, warn};

use crate::briefing::{BriefingSnapshot, StatePublisher};
use crate::clock::Clock;
use crate::config::ai::AiSelection;
use crate::config::{BriefingConfig, ConfigSource};
use crate::home::{average_temperature, render_temperature, StateStore};
use crate::ingest::fetch_news;
use crate::ingest::types::{FeedFetcher, NewsItem};
use crate::summarize::{
    fallback_text, RetryPolicy, SummarizationContext, SummarizerFactory,
};
use crate::weather::{fetch_weather, ForecastApi};

/// Upstream collaborators of a cycle.
#[derive(Clone)]
pub struct Sources {
    pub feeds: Arc<dyn FeedFetcher>,
    pub forecast: Arc<dyn ForecastApi>,
    pub states: Arc<dyn StateStore>,
    pub summarizers: Arc<dyn SummarizerFactory>,
}

pub struct Orchestrator {
    config: Arc<dyn ConfigSource>,
    sources: Sources,
    publisher: StatePublisher,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        sources: Sources,
        publisher: StatePublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sources,
            publisher,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Compose and publish one snapshot. Source failures degrade inside the snapshot;
    /// only a panic ends a cycle without publishing.
    pub async fn run_cycle(&self) -> Arc<BriefingSnapshot> {
        let t0 = std::time::Instant::now();
        let cfg = self.config.load();
        info!("starting briefing generation");

        let snapshot = self.compose(&cfg).await;
        let published = self.publisher.publish(&cfg.briefing_entity, snapshot).await;

        histogram!("briefing_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            news = published.news_items.len(),
            ai = published.ai_summary.is_some(),
            "briefing generated"
        );
        published
    }

    /// Gather every part of the briefing and assemble the snapshot in one step.
    pub async fn compose(&self, cfg: &BriefingConfig) -> BriefingSnapshot {
        let now_utc = self.clock.now();
        let now = cfg.timezone().localize(now_utc);
        let weather_settings = cfg.weather();

        let news = async {
            let items = fetch_news(&*self.sources.feeds, &cfg.rss_feeds, cfg.news_hours, now_utc).await;
            let (ai_summary, news_text) = self.news_text(cfg, &items, now).await;
            (items, ai_summary, news_text)
        };
        let weather = fetch_weather(&*self.sources.forecast, &weather_settings, now);
        let temperature = average_temperature(&*self.sources.states, &cfg.temp_sensors);

        let ((news_items, ai_summary, news_text), weather, avg_temp) =
            tokio::join!(news, weather, temperature);

        BriefingSnapshot {
            news_items,
            ai_summary,
            news_text,
            weather_text: weather.render(),
            weather,
            avg_temp_text: render_temperature(avg_temp),
            composed_date: now.format("%Y-%m-%d").to_string(),
            generated_at: now,
        }
    }

    /// AI summary (with retries) when configured, else the plain title list.
    async fn news_text(
        &self,
        cfg: &BriefingConfig,
        items: &[NewsItem],
        now: DateTime<FixedOffset>,
    ) -> (Option<String>, String) {
        let selection = cfg.ai_selection();
        match &selection {
            AiSelection::MissingKey { provider } => {
                info!(provider = %provider, "no API key for provider, falling back to list");
                return (None, fallback_text(items));
            }
            AiSelection::Unknown { provider } => {
                error!(provider = %provider, "unknown AI provider");
                return (None, fallback_text(items));
            }
            AiSelection::OpenAi { .. } | AiSelection::Gemini { .. } => {}
        }
        if items.is_empty() {
            return (None, fallback_text(items));
        }
        let Some(summarizer) = self.sources.summarizers.build(&selection, &cfg.ai_language) else {
            warn!(provider = selection.provider_name(), "summarizer unavailable");
            return (None, fallback_text(items));
        };

        let ctx = SummarizationContext::at(now);
        let ctx = &ctx;
        info!(provider = summarizer.provider_name(), "using AI summarizer");
        let summary = self
            .retry
            .run(&*self.clock, |attempt| {
                let summarizer = Arc::clone(&summarizer);
                counter!("summarizer_attempts_total", "provider" => summarizer.provider_name())
                    .increment(1);
                async move {
                    let out = summarizer.summarize(items, ctx).await;
                    if out.is_none() {
                        warn!(attempt, "AI summary attempt failed");
                    }
                    out
                }
            })
            .await;

        match summary {
            Some(text) => {
                let news_text = format!("AI Híradó:\n{text}");
                (Some(text), news_text)
            }
            None => {
                warn!(
                    attempts = self.retry.max_attempts,
                    "AI summary unavailable, using title list"
                );
                (None, fallback_text(items))
            }
        }
    }
}
