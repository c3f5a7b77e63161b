// src/summarize/gemini.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::summarize::openai::snippet;
use crate::summarize::CompletionProvider;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        // accept both "gemini-1.5-flash" and "models/gemini-1.5-flash"
        let model = model.trim_start_matches("models/").to_string();
        Self {
            http,
            api_key,
            model,
            base_url: DEFAULT_GEMINI_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, req: &Req<'_>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(req)
            .send()
            .await
            .context("gemini http post()")?;
        let status = resp.status();
        let body = resp.text().await.context("gemini http .text()")?;
        if !status.is_success() {
            bail!("gemini returned {status}: {}", snippet(&body));
        }
        parse_generate_response(&body)
    }

    /// Debug aid after a failed call: which models accept generateContent with this key.
    async fn log_available_models(&self) {
        #[derive(Deserialize)]
        struct ModelList {
            #[serde(default)]
            models: Vec<ModelInfo>,
        }
        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
            #[serde(default, rename = "supportedGenerationMethods")]
            methods: Vec<String>,
        }

        let url = format!("{}/models", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await;
        let list: Option<ModelList> = match res {
            Ok(resp) => resp.json().await.ok(),
            Err(_) => None,
        };
        match list {
            Some(list) => {
                let names: Vec<String> = list
                    .models
                    .into_iter()
                    .filter(|m| m.methods.iter().any(|x| x == "generateContent"))
                    .map(|m| m.name)
                    .collect();
                debug!(models = ?names, "gemini models supporting generateContent");
            }
            None => debug!("gemini model listing unavailable"),
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}

#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Deserialize)]
struct RespPart {
    #[serde(default)]
    text: String,
}

pub fn parse_generate_response(body: &str) -> Result<String> {
    let resp: Resp = serde_json::from_str(body).context("parsing generateContent json")?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .ok_or_else(|| anyhow!("generateContent without candidates"))?;
    Ok(text.trim().to_string())
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let req = Req {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };
        let result = self.generate(&req).await;
        if result.is_err() {
            self.log_available_models().await;
        }
        result
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
