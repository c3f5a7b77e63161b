// src/ingest/mod.rs
pub mod feed;
pub mod fetcher;
pub mod types;

use crate::ingest::types::{FeedDocument, FeedFetcher, NewsItem};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "News items kept after the time filter.");
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 1000 chars
    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }

    out
}

/// Keep entries of one feed whose publish (or update) time is strictly after `cutoff`.
/// Undated and untitled entries are dropped.
pub fn collect_recent(feed_url: &str, doc: FeedDocument, cutoff: DateTime<Utc>) -> Vec<NewsItem> {
    let source = doc
        .title
        .as_deref()
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| feed_url.to_string());

    let mut out = Vec::with_capacity(doc.entries.len());
    for entry in doc.entries {
        let Some(published_at) = entry.timestamp() else {
            continue;
        };
        if published_at <= cutoff {
            continue;
        }
        let title = normalize_text(entry.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            continue;
        }
        out.push(NewsItem {
            title,
            link: entry.link.unwrap_or_default(),
            summary: normalize_text(entry.summary.as_deref().unwrap_or_default()),
            source: source.clone(),
            published_at,
        });
    }
    out
}

/// Fetch every feed in order and keep items from the last `hours` hours.
/// A failing feed is logged and contributes nothing; the others are unaffected.
pub async fn fetch_news(
    fetcher: &dyn FeedFetcher,
    feeds: &[String],
    hours: u32,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    ensure_metrics_described();

    let cutoff = now - Duration::hours(i64::from(hours));
    let mut items = Vec::new();
    for url in feeds {
        match fetcher.fetch(url).await {
            Ok(doc) => {
                let mut kept = collect_recent(url, doc, cutoff);
                tracing::debug!(feed = %url, kept = kept.len(), "feed fetched");
                counter!("feed_items_total").increment(kept.len() as u64);
                items.append(&mut kept);
            }
            Err(e) => {
                tracing::warn!(error = ?e, feed = %url, "feed error");
                counter!("feed_errors_total").increment(1);
            }
        }
    }
    items
}
