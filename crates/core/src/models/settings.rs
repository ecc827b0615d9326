use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Runtime configuration for the core. An embedder loads this however it
/// likes (file, environment, database) and hands it to the facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage", "twelvedata").
    /// Values: the API key string.
    pub api_keys: HashMap<String, String>,

    /// UTC offset of the exchange's local clock, in hours (KRX: +9).
    pub market_tz_offset_hours: i32,

    /// Start of the live-trading window in exchange-local time.
    /// While the market is open, a price-history miss never triggers an
    /// external provider call (bounds latency and provider quota).
    pub market_open: NaiveTime,

    /// End of the live-trading window in exchange-local time.
    pub market_close: NaiveTime,

    /// How often the alert evaluator runs.
    pub alert_check_interval: Duration,

    /// Pause between successive symbol fetches during a bulk refresh,
    /// to stay under provider rate limits.
    pub refresh_throttle: Duration,

    /// Commentary generation settings.
    pub ai: AiSettings,
}

/// Settings for the AI commentary call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Upper bound on one generation call; on expiry the analysis is
    /// recorded as failed and the caller gets the deterministic fallback.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            market_tz_offset_hours: 9,
            market_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            market_close: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            alert_check_interval: Duration::from_secs(30),
            refresh_throttle: Duration::from_millis(500),
            ai: AiSettings::default(),
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(90),
        }
    }
}
