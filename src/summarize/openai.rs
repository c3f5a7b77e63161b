// src/summarize/openai.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::summarize::CompletionProvider;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiProvider {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            url: DEFAULT_OPENAI_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

pub fn parse_chat_response(body: &str) -> Result<String> {
    let resp: Resp = serde_json::from_str(body).context("parsing chat completion json")?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("chat completion without content"))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai http post()")?;
        let status = resp.status();
        let body = resp.text().await.context("openai http .text()")?;
        if !status.is_success() {
            bail!("openai returned {status}: {}", snippet(&body));
        }
        parse_chat_response(&body)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// First 300 chars of an error body, enough for quota/auth messages.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(300).collect()
}
