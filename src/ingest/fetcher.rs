// src/ingest/fetcher.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;

use crate::ingest::feed::parse_feed;
use crate::ingest::types::{FeedDocument, FeedFetcher};

/// Fetches feeds over HTTP and parses them with [`parse_feed`].
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("feed http get {url}"))?
            .error_for_status()
            .with_context(|| format!("feed http status {url}"))?
            .text()
            .await
            .context("feed http .text()")?;

        let t0 = std::time::Instant::now();
        let doc = parse_feed(&body).with_context(|| format!("parsing feed {url}"))?;
        histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(doc)
    }
}
