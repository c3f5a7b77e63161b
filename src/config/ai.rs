// src/config/ai.rs
use super::{non_empty, BriefingConfig};

/// Which summarizer (if any) the current options ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiSelection {
    OpenAi { api_key: String, model: String },
    Gemini { api_key: String, model: String },
    /// Known provider, but no key configured for it.
    MissingKey { provider: String },
    Unknown { provider: String },
}

impl AiSelection {
    pub fn provider_name(&self) -> &str {
        match self {
            AiSelection::OpenAi { .. } => "openai",
            AiSelection::Gemini { .. } => "gemini",
            AiSelection::MissingKey { provider } | AiSelection::Unknown { provider } => provider,
        }
    }
}

impl BriefingConfig {
    pub fn ai_selection(&self) -> AiSelection {
        match self.ai_provider.as_str() {
            "openai" => match non_empty(&self.openai_api_key) {
                Some(key) => AiSelection::OpenAi {
                    api_key: key.to_string(),
                    model: self.openai_model.clone(),
                },
                None => AiSelection::MissingKey {
                    provider: "openai".into(),
                },
            },
            "gemini" => match non_empty(&self.gemini_api_key) {
                Some(key) => AiSelection::Gemini {
                    api_key: key.to_string(),
                    model: self.gemini_model.clone(),
                },
                None => AiSelection::MissingKey {
                    provider: "gemini".into(),
                },
            },
            other => AiSelection::Unknown {
                provider: other.to_string(),
            },
        }
    }
}
