// src/weather/mod.rs
//! Current conditions + one forward-looking forecast slot chosen by time of day.
//!
//! The first entry of the 3-hour forecast list stands in for "now", so the current
//! conditions can be up to ~1.5h stale. No separate current-weather call is made.

pub mod openweather;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::WeatherSettings;

pub const NOT_CONFIGURED_TEXT: &str = "Weather API key not configured.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub at: DateTime<Utc>,
    pub description: String,
    pub temp_c: f64,
}

#[async_trait]
pub trait ForecastApi: Send + Sync {
    /// Multi-day forecast list at 3-hour granularity, in upstream order.
    async fn forecast(&self, api_key: &str, lat: f64, lon: f64) -> Result<Vec<ForecastEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastSlot {
    Afternoon,
    Evening,
    TomorrowMorning,
}

impl ForecastSlot {
    pub fn label(self) -> &'static str {
        match self {
            ForecastSlot::Afternoon => "délután",
            ForecastSlot::Evening => "este",
            ForecastSlot::TomorrowMorning => "holnap reggel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current_description: String,
    pub current_temp_c: f64,
    pub forecast_label: String,
    pub forecast_description: String,
    pub forecast_temp_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherReport {
    NotConfigured,
    Ready(WeatherSnapshot),
    Failed { reason: String },
}

impl WeatherReport {
    pub fn render(&self) -> String {
        match self {
            WeatherReport::NotConfigured => NOT_CONFIGURED_TEXT.to_string(),
            WeatherReport::Ready(w) => format!(
                "Időjárás: {}, {:.1}°C. Várható ({}): {}, {:.1}°C.",
                w.current_description,
                w.current_temp_c,
                w.forecast_label,
                w.forecast_description,
                w.forecast_temp_c
            ),
            WeatherReport::Failed { reason } => format!("Error fetching weather: {reason}"),
        }
    }
}

/// Which slot to forecast and its wall-clock target, based on the local hour of `now`:
/// [0,10) today 14:00, [10,18) today 20:00, [18,24) tomorrow 08:00.
pub fn forecast_target(now: DateTime<FixedOffset>) -> (ForecastSlot, DateTime<FixedOffset>) {
    let today = now.date_naive();
    let offset = *now.offset();
    match now.hour() {
        0..=9 => (ForecastSlot::Afternoon, at_local(today, 14, offset)),
        10..=17 => (ForecastSlot::Evening, at_local(today, 20, offset)),
        _ => {
            let tomorrow = today.succ_opt().unwrap_or(today);
            (ForecastSlot::TomorrowMorning, at_local(tomorrow, 8, offset))
        }
    }
}

fn at_local(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN));
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Entry closest to `target`; ties keep the first one seen.
pub fn select_closest(entries: &[ForecastEntry], target: DateTime<Utc>) -> Option<&ForecastEntry> {
    let mut best: Option<(&ForecastEntry, i64)> = None;
    for e in entries {
        let diff = (e.at - target).num_seconds().abs();
        match best {
            Some((_, d)) if d <= diff => {}
            _ => best = Some((e, diff)),
        }
    }
    best.map(|(e, _)| e)
}

pub fn build_snapshot(entries: &[ForecastEntry], now: DateTime<FixedOffset>) -> Result<WeatherSnapshot> {
    let Some(current) = entries.first() else {
        bail!("empty forecast list");
    };
    let (slot, target) = forecast_target(now);
    let Some(future) = select_closest(entries, target.with_timezone(&Utc)) else {
        bail!("no forecast entry near {target}");
    };
    Ok(WeatherSnapshot {
        current_description: current.description.clone(),
        current_temp_c: current.temp_c,
        forecast_label: slot.label().to_string(),
        forecast_description: future.description.clone(),
        forecast_temp_c: future.temp_c,
    })
}

/// Never fails: a missing key and any upstream error are reported inside the value.
pub async fn fetch_weather(
    api: &dyn ForecastApi,
    settings: &WeatherSettings,
    now: DateTime<FixedOffset>,
) -> WeatherReport {
    let Some(key) = settings.api_key.as_deref() else {
        return WeatherReport::NotConfigured;
    };
    let (Some(lat), Some(lon)) = (settings.lat, settings.lon) else {
        return WeatherReport::Failed {
            reason: "weather_lat/weather_lon not configured".to_string(),
        };
    };

    let result = match api.forecast(key, lat, lon).await {
        Ok(list) => build_snapshot(&list, now),
        Err(e) => Err(e),
    };
    match result {
        Ok(snapshot) => WeatherReport::Ready(snapshot),
        Err(e) => {
            warn!(error = ?e, "weather fetch failed");
            WeatherReport::Failed {
                reason: format!("{e:#}"),
            }
        }
    }
}
