// src/summarize/mod.rs
//! News summarization: prompt construction, provider abstraction and the
//! output contract every summary must satisfy (greeting, date, prose).

pub mod gemini;
pub mod openai;
pub mod retry;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Timelike};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ai::AiSelection;
use crate::ingest::types::NewsItem;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use retry::RetryPolicy;

/// Only the first 50 items ever reach a provider.
pub const MAX_INPUT_ITEMS: usize = 50;

pub const SYSTEM_PROMPT: &str = "You are a helpful news assistant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfDay {
    Reggel,
    Napkozben,
    Este,
}

impl PartOfDay {
    /// [5,10) reggel, [10,18) napközben, everything else este.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=9 => PartOfDay::Reggel,
            10..=17 => PartOfDay::Napkozben,
            _ => PartOfDay::Este,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PartOfDay::Reggel => "reggel",
            PartOfDay::Napkozben => "napközben",
            PartOfDay::Este => "este",
        }
    }

    pub fn greeting(self) -> &'static str {
        match self {
            PartOfDay::Reggel => "Jó reggelt",
            PartOfDay::Napkozben => "Jó napot",
            PartOfDay::Este => "Jó estét",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationContext {
    pub current_date: String,
    pub part_of_day: PartOfDay,
}

impl SummarizationContext {
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self {
            current_date: now.format("%Y-%m-%d").to_string(),
            part_of_day: PartOfDay::from_hour(now.hour()),
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// A short prose briefing, or `None` when the provider call failed for any reason.
    async fn summarize(&self, items: &[NewsItem], ctx: &SummarizationContext) -> Option<String>;
    fn provider_name(&self) -> &'static str;
}

/// Low-level provider: one remote completion call. Kept separate so every provider
/// shares the same prompt and contract handling in [`PromptSummarizer`].
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub struct PromptSummarizer<P: CompletionProvider> {
    inner: P,
    language: String,
}

impl<P: CompletionProvider> PromptSummarizer<P> {
    pub fn new(inner: P, language: impl Into<String>) -> Self {
        Self {
            inner,
            language: language.into(),
        }
    }
}

#[async_trait]
impl<P: CompletionProvider> Summarizer for PromptSummarizer<P> {
    async fn summarize(&self, items: &[NewsItem], ctx: &SummarizationContext) -> Option<String> {
        let capped = &items[..items.len().min(MAX_INPUT_ITEMS)];
        let prompt = build_prompt(capped, ctx, &self.language);

        let provider = self.inner.name();
        match self.inner.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => {
                let out = enforce_contract(&text, ctx);
                if out.is_none() {
                    warn!(provider, "provider returned an empty summary");
                    counter!("summarizer_failures_total", "provider" => provider).increment(1);
                }
                out
            }
            Err(e) => {
                warn!(error = ?e, provider, "summarization failed");
                counter!("summarizer_failures_total", "provider" => provider).increment(1);
                None
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

pub fn build_prompt(items: &[NewsItem], ctx: &SummarizationContext, language: &str) -> String {
    let mut news_list = String::new();
    for (i, item) in items.iter().take(MAX_INPUT_ITEMS).enumerate() {
        news_list.push_str(&format!("{}. {} ({})\n", i + 1, item.title, item.source));
    }
    let greeting = ctx.part_of_day.greeting();
    let date = &ctx.current_date;
    format!(
        "Te egy intelligens hírszerkesztő vagy. Ma {date} van. Most éppen '{pod}' van.\n\
         Válaszd ki az alábbi hírlistából legfeljebb 5 legfontosabb hírt, és foglald össze őket \
         egy rövid, olvasmányos napi tájékoztató formájában {language}.\n\
         FONTOS: A válaszod pontosan így kezdődjön: '{greeting}!', utána mondd ki a dátumot \
         ({date}) és a mai névnapot.\n\
         Példa: '{greeting}! Ma {date} van, Jakab névnapja.'\n\
         A stílus legyen tárgyilagos, de barátságos. Ne sorolj fel, ne sorszámozz, \
         kerek mondatokban fogalmazz!\n\
         Hírek:\n{news_list}",
        pod = ctx.part_of_day.label(),
    )
}

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•–]|\d{1,2}[.)])\s+").expect("list marker regex"));

/// Bring a provider response in line with the briefing contract: list markers are
/// dropped and lines folded into paragraphs, the greeting and the literal date are
/// inserted when missing. Blank responses yield `None`.
pub fn enforce_contract(raw: &str, ctx: &SummarizationContext) -> Option<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in raw.lines() {
        let line = RE_LIST_MARKER.replace(line, "");
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    if paragraphs.is_empty() {
        return None;
    }
    let mut body = paragraphs.join("\n\n");

    // A greeting for the wrong part of day is swapped, not kept.
    let greeting = ctx.part_of_day.greeting();
    let leading = [PartOfDay::Reggel, PartOfDay::Napkozben, PartOfDay::Este]
        .into_iter()
        .map(PartOfDay::greeting)
        .find(|g| {
            body.get(..g.len())
                .is_some_and(|head| head.to_lowercase() == g.to_lowercase())
        });
    if let Some(found) = leading {
        body = format!("{greeting}{}", &body[found.len()..]);
    }
    let greeted = leading.is_some();
    let date_sentence = format!("Ma {} van.", ctx.current_date);

    if greeted {
        if !body.contains(&ctx.current_date) {
            let after = &body[greeting.len()..];
            let split = after
                .find(['!', '.', ','])
                .map(|p| greeting.len() + p + 1)
                .unwrap_or(greeting.len());
            let (head, tail) = body.split_at(split);
            body = format!("{} {} {}", head.trim_end(), date_sentence, tail.trim_start())
                .trim_end()
                .to_string();
        }
    } else if body.contains(&ctx.current_date) {
        body = format!("{greeting}! {body}");
    } else {
        body = format!("{greeting}! {date_sentence} {body}");
    }
    Some(body)
}

/// Plain list of titles used whenever no AI summary is available.
pub fn fallback_text(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return "Nincsenek friss hírek.".to_string();
    }
    let mut out = String::from("Legfontosabb hírek:");
    for item in items {
        out.push_str("\n- ");
        out.push_str(&item.title);
    }
    out
}

/// Builds the configured summarizer variant. `None` when the selection has no usable provider.
pub trait SummarizerFactory: Send + Sync {
    fn build(&self, selection: &AiSelection, language: &str) -> Option<Arc<dyn Summarizer>>;
}

impl<F> SummarizerFactory for F
where
    F: Fn(&AiSelection, &str) -> Option<Arc<dyn Summarizer>> + Send + Sync,
{
    fn build(&self, selection: &AiSelection, language: &str) -> Option<Arc<dyn Summarizer>> {
        self(selection, language)
    }
}

/// Real providers sharing one HTTP client.
#[derive(Clone)]
pub struct HttpSummarizerFactory {
    http: reqwest::Client,
}

impl HttpSummarizerFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl SummarizerFactory for HttpSummarizerFactory {
    fn build(&self, selection: &AiSelection, language: &str) -> Option<Arc<dyn Summarizer>> {
        match selection {
            AiSelection::OpenAi { api_key, model } => Some(Arc::new(PromptSummarizer::new(
                OpenAiProvider::new(self.http.clone(), api_key.clone(), model.clone()),
                language,
            ))),
            AiSelection::Gemini { api_key, model } => Some(Arc::new(PromptSummarizer::new(
                GeminiProvider::new(self.http.clone(), api_key.clone(), model.clone()),
                language,
            ))),
            AiSelection::MissingKey { .. } | AiSelection::Unknown { .. } => None,
        }
    }
}
