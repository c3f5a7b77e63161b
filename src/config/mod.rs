// src/config/mod.rs
//! Add-on options: loaded from JSON (or TOML) on every cycle, so edits apply without a restart.

pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";
pub const ENV_OPTIONS_PATH: &str = "VMBRIEFING_OPTIONS_PATH";

pub const DEFAULT_NEWS_HOURS: u32 = 24;
pub const DEFAULT_UPDATE_INTERVAL_MIN: u64 = 60;
pub const DEFAULT_BRIEFING_ENTITY: &str = "sensor.vmbriefing_text";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BriefingConfig {
    pub rss_feeds: Vec<String>,
    pub news_hours: u32,
    /// "openai" | "gemini" (case-insensitive)
    pub ai_provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Natural language the summary is written in, as it appears in the prompt.
    pub ai_language: String,
    pub weather_api_key: Option<String>,
    pub weather_lat: Option<f64>,
    pub weather_lon: Option<f64>,
    pub temp_sensors: Vec<String>,
    /// Minutes between briefing cycles.
    pub update_interval: u64,
    /// IANA zone ("Europe/Budapest") or fixed UTC offset ("+01:00") used for
    /// part-of-day and forecast targets.
    pub timezone: String,
    pub briefing_entity: String,
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            rss_feeds: Vec::new(),
            news_hours: DEFAULT_NEWS_HOURS,
            ai_provider: "openai".to_string(),
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            ai_language: "magyarul".to_string(),
            weather_api_key: None,
            weather_lat: None,
            weather_lon: None,
            temp_sensors: Vec::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL_MIN,
            timezone: "+00:00".to_string(),
            briefing_entity: DEFAULT_BRIEFING_ENTITY.to_string(),
        }
    }
}

/// Weather-related subset handed to the weather source.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSettings {
    pub api_key: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl BriefingConfig {
    /// Load options from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "options file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading options from {}", path.display()))
            }
        };
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext)
    }

    /// Parse options text. TOML is used when hinted by extension, JSON otherwise.
    pub fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        let cfg: Self = if hint_ext == "toml" {
            toml::from_str(s).context("parsing TOML options")?
        } else {
            serde_json::from_str(s).context("parsing JSON options")?
        };
        Ok(cfg.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.ai_provider = self.ai_provider.trim().to_lowercase();
        if self.update_interval == 0 {
            self.update_interval = DEFAULT_UPDATE_INTERVAL_MIN;
        }
        if self.briefing_entity.trim().is_empty() {
            self.briefing_entity = DEFAULT_BRIEFING_ENTITY.to_string();
        }
        if self.ai_language.trim().is_empty() {
            self.ai_language = "magyarul".to_string();
        }
        self.rss_feeds = clean_list(self.rss_feeds);
        self.temp_sensors = clean_list(self.temp_sensors);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.max(1) * 60)
    }

    /// Configured zone; an unusable value is logged and UTC is used for this cycle.
    pub fn timezone(&self) -> LocalZone {
        match LocalZone::parse(&self.timezone) {
            Ok(zone) => zone,
            Err(e) => {
                warn!(error = ?e, timezone = %self.timezone, "invalid timezone option, using UTC");
                LocalZone::utc()
            }
        }
    }

    pub fn weather(&self) -> WeatherSettings {
        WeatherSettings {
            api_key: non_empty(&self.weather_api_key).map(str::to_string),
            lat: self.weather_lat,
            lon: self.weather_lon,
        }
    }
}

/// Source of the current options; re-read at the start of every cycle.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> BriefingConfig;
}

/// A fixed config acts as its own source (handy in tests and one-shot runs).
impl ConfigSource for BriefingConfig {
    fn load(&self) -> BriefingConfig {
        self.clone()
    }
}

#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$VMBRIEFING_OPTIONS_PATH`, falling back to `/data/options.json`.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_OPTIONS_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OPTIONS_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> BriefingConfig {
        match BriefingConfig::load_from(&self.path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = ?e, path = %self.path.display(), "options unreadable, using defaults");
                BriefingConfig::default()
            }
        }
    }
}

/// Wall-clock zone of the briefing. Named zones follow DST; offsets are fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl LocalZone {
    pub fn utc() -> Self {
        LocalZone::Fixed(Utc.fix())
    }

    /// Offsets ("+01:00", "Z") first, then IANA names ("Europe/Budapest").
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.starts_with(['+', '-'])
            || s.is_empty()
            || s.eq_ignore_ascii_case("z")
            || s.eq_ignore_ascii_case("utc")
        {
            return parse_utc_offset(s).map(LocalZone::Fixed);
        }
        s.parse::<Tz>()
            .map(LocalZone::Named)
            .map_err(|e| anyhow!("unknown timezone {raw:?}: {e}"))
    }

    /// Local time of `at` with the offset in effect at that instant.
    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            LocalZone::Fixed(offset) => at.with_timezone(offset),
            LocalZone::Named(tz) => at.with_timezone(tz).fixed_offset(),
        }
    }
}

/// Treat blank strings (HA renders unset options as "") the same as absent.
pub(crate) fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse "Z", "UTC", "+hh:mm", "-hh:mm" or "+hhmm".
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("zero offset"));
    }
    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => bail!("timezone offset must start with '+' or '-': {raw:?}"),
    };
    let (h, m) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: u32 = h.parse().with_context(|| format!("bad offset hours in {raw:?}"))?;
    let minutes: u32 = m.parse().with_context(|| format!("bad offset minutes in {raw:?}"))?;
    if hours > 14 || minutes > 59 {
        bail!("timezone offset out of range: {raw:?}");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)
        .ok_or_else(|| anyhow!("timezone offset out of range: {raw:?}"))
}
