// src/briefing/publisher.rs
use std::sync::Arc;

use metrics::counter;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::briefing::{BriefingSnapshot, SnapshotHandle};
use crate::home::{EntityState, StateStore};

/// Makes a finished snapshot visible: local holder first, then the Home Assistant entity.
#[derive(Clone)]
pub struct StatePublisher {
    store: Arc<dyn StateStore>,
    holder: SnapshotHandle,
}

impl StatePublisher {
    pub fn new(store: Arc<dyn StateStore>, holder: SnapshotHandle) -> Self {
        Self { store, holder }
    }

    /// Sink errors are logged and dropped; they never undo the local swap.
    pub async fn publish(&self, entity_id: &str, snapshot: BriefingSnapshot) -> Arc<BriefingSnapshot> {
        let state = sink_state(&snapshot);
        let current = self.holder.replace(snapshot);

        match self.store.set_state(entity_id, &state).await {
            Ok(()) => info!(entity = entity_id, "briefing entity updated"),
            Err(e) => {
                warn!(error = ?e, entity = entity_id, "briefing entity update failed");
                counter!("sink_publish_errors_total").increment(1);
            }
        }
        current
    }
}

/// Entity payload: state "OK" plus the rendered briefing as attributes.
pub fn sink_state(snapshot: &BriefingSnapshot) -> EntityState {
    let mut attributes = Map::new();
    attributes.insert("briefing_text".into(), json!(snapshot.briefing_text()));
    attributes.insert("last_updated".into(), json!(snapshot.last_updated()));
    attributes.insert("news_text".into(), json!(snapshot.news_text));
    attributes.insert(
        "ai_summary".into(),
        snapshot
            .ai_summary
            .as_ref()
            .map(|s| json!(s))
            .unwrap_or(Value::Null),
    );
    attributes.insert("weather_text".into(), json!(snapshot.weather_text));
    attributes.insert("temperature_text".into(), json!(snapshot.avg_temp_text));
    attributes.insert("composed_date".into(), json!(snapshot.composed_date));
    attributes.insert("friendly_name".into(), json!("VMBriefing"));
    EntityState {
        state: "OK".to_string(),
        attributes,
    }
}
