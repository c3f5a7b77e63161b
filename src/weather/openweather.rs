// src/weather/openweather.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::weather::{ForecastApi, ForecastEntry};

pub const DEFAULT_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// OpenWeatherMap 5 day / 3 hour forecast (free tier).
#[derive(Clone)]
pub struct OpenWeatherMap {
    client: reqwest::Client,
    url: String,
}

impl OpenWeatherMap {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: DEFAULT_FORECAST_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResp {
    list: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// Parse an OpenWeatherMap forecast body into entries, keeping upstream order.
pub fn parse_forecast(body: &str) -> Result<Vec<ForecastEntry>> {
    let resp: ForecastResp = serde_json::from_str(body).context("parsing forecast json")?;
    resp.list
        .into_iter()
        .map(|it| {
            let at = DateTime::from_timestamp(it.dt, 0)
                .with_context(|| format!("forecast timestamp out of range: {}", it.dt))?;
            Ok(ForecastEntry {
                at,
                description: it
                    .weather
                    .into_iter()
                    .next()
                    .map(|c| c.description)
                    .unwrap_or_default(),
                temp_c: it.main.temp,
            })
        })
        .collect()
}

#[async_trait]
impl ForecastApi for OpenWeatherMap {
    async fn forecast(&self, api_key: &str, lat: f64, lon: f64) -> Result<Vec<ForecastEntry>> {
        let body = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
                ("lang", "hu".to_string()),
            ])
            .send()
            .await
            .context("weather http get()")?
            .error_for_status()
            .context("weather http status")?
            .text()
            .await
            .context("weather http .text()")?;
        parse_forecast(&body)
    }
}
