// src/home/temperature.rs
use tracing::warn;

use crate::home::StateStore;

/// Mean of all sensors reporting a numeric state. `None` when no sensor is usable.
pub async fn average_temperature(store: &dyn StateStore, sensor_ids: &[String]) -> Option<f64> {
    if sensor_ids.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for id in sensor_ids {
        match store.get_state(id).await {
            Ok(Some(st)) => {
                if let Some(v) = parse_reading(&st.state) {
                    total += v;
                    count += 1;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = ?e, sensor = %id, "sensor read failed"),
        }
    }

    (count > 0).then(|| total / count as f64)
}

fn parse_reading(state: &str) -> Option<f64> {
    let s = state.trim();
    if s.eq_ignore_ascii_case("unknown") || s.eq_ignore_ascii_case("unavailable") {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn render_temperature(avg: Option<f64>) -> String {
    match avg {
        Some(t) => format!("A lakás átlagos hőmérséklete: {t:.1}°C."),
        None => "A lakás hőmérséklete nem elérhető.".to_string(),
    }
}
