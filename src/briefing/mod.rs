// src/briefing/mod.rs
//! The briefing snapshot, its shared holder, and the cycle that produces it.

pub mod orchestrator;
pub mod publisher;

use std::sync::{Arc, RwLock};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::ingest::types::NewsItem;
use crate::weather::WeatherReport;

pub use orchestrator::{Orchestrator, Sources};
pub use publisher::StatePublisher;

/// One complete briefing. Built in a single step at the end of a cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingSnapshot {
    pub news_items: Vec<NewsItem>,
    pub ai_summary: Option<String>,
    pub news_text: String,
    pub weather: WeatherReport,
    pub weather_text: String,
    pub avg_temp_text: String,
    pub composed_date: String,
    pub generated_at: DateTime<FixedOffset>,
}

impl BriefingSnapshot {
    /// Full text as shown on the status page and pushed to Home Assistant.
    pub fn briefing_text(&self) -> String {
        format!(
            "{}\n{}\n\n{}",
            self.weather_text, self.avg_temp_text, self.news_text
        )
    }

    /// ctime-style stamp, e.g. "Wed May  1 08:00:00 2024".
    pub fn last_updated(&self) -> String {
        self.generated_at.format("%a %b %e %H:%M:%S %Y").to_string()
    }
}

/// Shared holder for the current snapshot. Writers swap the whole `Arc`; readers
/// clone it, so a reader only ever sees one complete snapshot.
#[derive(Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Option<Arc<BriefingSnapshot>>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first cycle has been published.
    pub fn current(&self) -> Option<Arc<BriefingSnapshot>> {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install `snapshot` as current and return it.
    pub fn replace(&self, snapshot: BriefingSnapshot) -> Arc<BriefingSnapshot> {
        let fresh = Arc::new(snapshot);
        let mut g = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *g = Some(Arc::clone(&fresh));
        fresh
    }
}
