// tests/common/mod.rs
//
// In-memory stand-ins for every upstream of a briefing cycle.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Map;

use vm_briefing::clock::ManualClock;
use vm_briefing::config::ai::AiSelection;
use vm_briefing::config::BriefingConfig;
use vm_briefing::home::{EntityState, StateStore};
use vm_briefing::ingest::feed::parse_feed;
use vm_briefing::ingest::types::{FeedDocument, FeedFetcher, NewsItem};
use vm_briefing::summarize::{SummarizationContext, Summarizer, SummarizerFactory};
use vm_briefing::weather::{ForecastApi, ForecastEntry};
use vm_briefing::{Orchestrator, SnapshotHandle, Sources, StatePublisher};

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Feeds keyed by URL: XML bodies parse normally, anything else is a fetch error.
#[derive(Default)]
pub struct StaticFeeds {
    bodies: HashMap<String, Result<String, String>>,
}

impl StaticFeeds {
    pub fn with_xml(mut self, url: &str, xml: impl Into<String>) -> Self {
        self.bodies.insert(url.to_string(), Ok(xml.into()));
        self
    }

    pub fn with_error(mut self, url: &str, msg: &str) -> Self {
        self.bodies.insert(url.to_string(), Err(msg.to_string()));
        self
    }
}

#[async_trait]
impl FeedFetcher for StaticFeeds {
    async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        match self.bodies.get(url) {
            Some(Ok(xml)) => parse_feed(xml),
            Some(Err(msg)) => Err(anyhow!("{msg}")),
            None => Err(anyhow!("404 for {url}")),
        }
    }
}

pub struct StaticForecast {
    result: Result<Vec<ForecastEntry>, String>,
    pub calls: AtomicU32,
}

impl StaticForecast {
    pub fn ok(entries: Vec<ForecastEntry>) -> Self {
        Self { result: Ok(entries), calls: AtomicU32::new(0) }
    }

    pub fn failing(msg: &str) -> Self {
        Self { result: Err(msg.to_string()), calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl ForecastApi for StaticForecast {
    async fn forecast(&self, _api_key: &str, _lat: f64, _lon: f64) -> Result<Vec<ForecastEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|m| anyhow!("{m}"))
    }
}

/// Home Assistant stand-in: sensor reads from a fixed map, writes recorded in order.
#[derive(Default)]
pub struct MemoryStates {
    sensors: HashMap<String, String>,
    pub writes: Mutex<Vec<(String, EntityState)>>,
    pub fail_writes: AtomicBool,
}

impl MemoryStates {
    pub fn with_sensor(mut self, id: &str, state: &str) -> Self {
        self.sensors.insert(id.to_string(), state.to_string());
        self
    }

    pub fn writes(&self) -> Vec<(String, EntityState)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStates {
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        Ok(self.sensors.get(entity_id).map(|s| EntityState {
            state: s.clone(),
            attributes: Map::new(),
        }))
    }

    async fn set_state(&self, entity_id: &str, state: &EntityState) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("502 Bad Gateway"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((entity_id.to_string(), state.clone()));
        Ok(())
    }
}

/// Replays a script of outcomes; once the script runs out every call fails.
pub struct ScriptedSummarizer {
    script: Mutex<VecDeque<Option<String>>>,
    pub calls: AtomicU32,
    pub seen_items: Mutex<Vec<usize>>,
}

impl ScriptedSummarizer {
    pub fn new(script: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(|s| s.map(str::to_string)).collect()),
            calls: AtomicU32::new(0),
            seen_items: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, items: &[NewsItem], _ctx: &SummarizationContext) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_items.lock().unwrap().push(items.len());
        self.script.lock().unwrap().pop_front().flatten()
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn factory_for(summarizer: Arc<ScriptedSummarizer>) -> Arc<dyn SummarizerFactory> {
    Arc::new(move |_: &AiSelection, _: &str| -> Option<Arc<dyn Summarizer>> {
        Some(summarizer.clone() as Arc<dyn Summarizer>)
    })
}

pub fn no_summarizer() -> Arc<dyn SummarizerFactory> {
    Arc::new(|_: &AiSelection, _: &str| -> Option<Arc<dyn Summarizer>> { None })
}

/// Options with one feed, OpenAI configured, weather configured, two sensors.
pub fn base_config() -> BriefingConfig {
    BriefingConfig {
        rss_feeds: vec!["https://news.test/rss".to_string()],
        news_hours: 24,
        ai_provider: "openai".to_string(),
        openai_api_key: Some("sk-test".to_string()),
        weather_api_key: Some("owm-test".to_string()),
        weather_lat: Some(47.5),
        weather_lon: Some(19.04),
        temp_sensors: vec!["sensor.living".to_string(), "sensor.bedroom".to_string()],
        ..BriefingConfig::default()
    }
}

pub fn forecast_list() -> Vec<ForecastEntry> {
    vec![
        ForecastEntry { at: utc(2024, 5, 1, 9, 0), description: "tiszta égbolt".into(), temp_c: 15.0 },
        ForecastEntry { at: utc(2024, 5, 1, 12, 0), description: "felhős".into(), temp_c: 19.5 },
        ForecastEntry { at: utc(2024, 5, 1, 15, 0), description: "zápor".into(), temp_c: 18.0 },
        ForecastEntry { at: utc(2024, 5, 1, 18, 0), description: "szeles".into(), temp_c: 16.2 },
        ForecastEntry { at: utc(2024, 5, 1, 21, 0), description: "derült".into(), temp_c: 12.0 },
        ForecastEntry { at: utc(2024, 5, 2, 6, 0), description: "köd".into(), temp_c: 8.4 },
        ForecastEntry { at: utc(2024, 5, 2, 9, 0), description: "napos".into(), temp_c: 14.0 },
    ]
}

/// Everything a test needs to drive and inspect one orchestrator.
pub struct Rig {
    pub orchestrator: Arc<Orchestrator>,
    pub snapshots: SnapshotHandle,
    pub states: Arc<MemoryStates>,
    pub clock: Arc<ManualClock>,
}

pub fn rig(
    config: Arc<dyn vm_briefing::config::ConfigSource>,
    feeds: StaticFeeds,
    forecast: StaticForecast,
    states: MemoryStates,
    summarizers: Arc<dyn SummarizerFactory>,
    now: DateTime<Utc>,
) -> Rig {
    let states = Arc::new(states);
    let clock = Arc::new(ManualClock::new(now));
    let snapshots = SnapshotHandle::new();
    let sources = Sources {
        feeds: Arc::new(feeds),
        forecast: Arc::new(forecast),
        states: states.clone(),
        summarizers,
    };
    let publisher = StatePublisher::new(states.clone(), snapshots.clone());
    let orchestrator = Orchestrator::new(config, sources, publisher, clock.clone());
    Rig {
        orchestrator: Arc::new(orchestrator),
        snapshots,
        states,
        clock,
    }
}
