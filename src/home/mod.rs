// src/home/mod.rs
//! Home Assistant state store: sensor reads for the temperature average and the
//! upsert of the published briefing entity.

pub mod client;
pub mod temperature;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use client::HomeAssistantClient;
pub use temperature::{average_temperature, render_temperature};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when the entity does not exist.
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>>;
    async fn set_state(&self, entity_id: &str, state: &EntityState) -> Result<()>;
}
