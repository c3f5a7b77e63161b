// src/home/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::home::{EntityState, StateStore};

pub const DEFAULT_HA_BASE_URL: &str = "http://supervisor/core/api";
pub const ENV_HA_TOKEN: &str = "SUPERVISOR_TOKEN";
pub const ENV_HA_BASE_URL: &str = "HA_BASE_URL";

/// REST client for `/states/{entity}`. Without a token every call is a logged no-op.
#[derive(Clone)]
pub struct HomeAssistantClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HomeAssistantClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// `$SUPERVISOR_TOKEN` + `$HA_BASE_URL` (default: the supervisor proxy).
    pub fn from_env(client: reqwest::Client) -> Self {
        let base = std::env::var(ENV_HA_BASE_URL).unwrap_or_else(|_| DEFAULT_HA_BASE_URL.into());
        Self::new(client, base, std::env::var(ENV_HA_TOKEN).ok())
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/states/{}", self.base_url, entity_id)
    }
}

#[async_trait]
impl StateStore for HomeAssistantClient {
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let Some(token) = self.token.as_deref() else {
            warn!(entity = entity_id, "{ENV_HA_TOKEN} not set, cannot fetch entity state");
            return Ok(None);
        };
        let resp = self
            .client
            .get(self.state_url(entity_id))
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("ha get state {entity_id}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let state = resp
            .error_for_status()
            .with_context(|| format!("ha get state {entity_id}"))?
            .json::<EntityState>()
            .await
            .context("ha state json")?;
        Ok(Some(state))
    }

    async fn set_state(&self, entity_id: &str, state: &EntityState) -> Result<()> {
        let Some(token) = self.token.as_deref() else {
            warn!(entity = entity_id, "{ENV_HA_TOKEN} not set, cannot update entity state");
            return Ok(());
        };
        let resp = self
            .client
            .post(self.state_url(entity_id))
            .bearer_auth(token)
            .json(state)
            .send()
            .await
            .with_context(|| format!("ha post state {entity_id}"))?;
        let status = resp.status();
        resp.error_for_status()
            .with_context(|| format!("ha post state {entity_id}"))?;
        debug!(entity = entity_id, %status, "entity state updated");
        Ok(())
    }
}
