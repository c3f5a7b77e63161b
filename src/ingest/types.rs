// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String, // feed title, or the feed URL when untitled
    pub published_at: DateTime<Utc>,
}

/// One parsed feed document (RSS or Atom), before any time filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Publish time, falling back to the last update time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.updated)
    }
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedDocument>;
}
