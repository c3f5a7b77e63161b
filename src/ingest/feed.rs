// src/ingest/feed.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom document parsing on top of quick-xml's serde support.
//!
//! quick-xml matches child elements by local name, so `<atom:link>` and `<link>` land in
//! the same field. Every text child that extensions commonly repeat is therefore read as
//! a list and the first non-empty value wins.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::types::{FeedDocument, FeedEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

// Text content of an element; attributes (`type`, `href`, `rdf:about`) are ignored.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

// RSS 1.0: items are siblings of the channel, not children.
#[derive(Debug, Deserialize)]
struct Rdf {
    channel: Option<Channel>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(default)]
    link: Vec<Text>,
    #[serde(default)]
    description: Vec<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    #[serde(default)]
    summary: Vec<Text>,
    #[serde(default)]
    content: Vec<Text>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse a feed body. The root element decides the dialect.
pub fn parse_feed(xml: &str) -> Result<FeedDocument> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    match sniff_kind(&xml_clean)? {
        FeedKind::Rss => from_str::<Rss>(&xml_clean)
            .map(from_rss)
            .context("parsing RSS 2.0 feed"),
        FeedKind::Rdf => from_str::<Rdf>(&xml_clean)
            .map(from_rdf)
            .context("parsing RSS 1.0 feed"),
        FeedKind::Atom => from_str::<AtomFeed>(&xml_clean)
            .map(from_atom)
            .context("parsing Atom feed"),
    }
}

fn sniff_kind(xml: &str) -> Result<FeedKind> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("reading feed root")? {
            Event::Start(e) | Event::Empty(e) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => bail!(
                        "feed is neither RSS nor Atom: root <{}>",
                        String::from_utf8_lossy(other)
                    ),
                };
            }
            Event::Eof => bail!("feed is neither RSS nor Atom: empty document"),
            _ => {}
        }
    }
}

fn first_text(values: Vec<Text>) -> Option<String> {
    values
        .into_iter()
        .map(|t| t.value)
        .find(|v| !v.trim().is_empty())
}

fn from_item(it: RssItem) -> FeedEntry {
    FeedEntry {
        title: first_text(it.title),
        link: first_text(it.link).map(|l| l.trim().to_string()),
        summary: first_text(it.description),
        published: it.pub_date.as_deref().and_then(parse_feed_date),
        updated: it.dc_date.as_deref().and_then(parse_feed_date),
    }
}

fn from_rss(rss: Rss) -> FeedDocument {
    FeedDocument {
        title: first_text(rss.channel.title),
        entries: rss.channel.item.into_iter().map(from_item).collect(),
    }
}

fn from_rdf(rdf: Rdf) -> FeedDocument {
    FeedDocument {
        title: rdf.channel.and_then(|c| first_text(c.title)),
        entries: rdf.item.into_iter().map(from_item).collect(),
    }
}

fn from_atom(atom: AtomFeed) -> FeedDocument {
    let entries = atom
        .entry
        .into_iter()
        .map(|e| {
            // rel defaults to "alternate" when absent
            let link = e
                .link
                .iter()
                .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
                .or_else(|| e.link.first())
                .and_then(|l| l.href.clone());
            FeedEntry {
                title: first_text(e.title),
                link,
                summary: first_text(e.summary).or_else(|| first_text(e.content)),
                published: e.published.as_deref().and_then(parse_feed_date),
                updated: e.updated.as_deref().and_then(parse_feed_date),
            }
        })
        .collect();
    FeedDocument {
        title: first_text(atom.title),
        entries,
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom); chrono's RFC 2822 parser is the lenient last resort.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()));
    parsed.or_else(|| {
        DateTime::parse_from_rfc2822(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

// HTML entities are not defined in XML; feeds still ship them.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&bdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
