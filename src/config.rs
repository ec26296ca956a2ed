//! Configuration management

use std::str::FromStr;

use anyhow::{self, Context, Result};

use crate::defaults::{
    DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS, DEFAULT_CIRCUIT_BREAKER_THRESHOLD, DEFAULT_DIRECTIONS_URL,
    DEFAULT_MAX_STOPS_PER_BATCH, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_REQUEST_INTERVAL_MS,
    DEFAULT_TWO_OPT_MAX_ITERATIONS,
};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Maps API key (optional, falls back to mock routing if unset)
    pub google_maps_api_key: Option<String>,

    /// Directions endpoint
    pub directions_url: String,

    /// Stops per provider request, destination included
    pub max_stops_per_batch: usize,

    pub request_interval_ms: u64,

    pub provider_timeout_secs: u64,

    /// Consecutive provider failures before requests are skipped
    pub breaker_threshold: u32,

    pub breaker_recovery_secs: u64,

    /// 2-opt pass cap
    pub sequencer_max_iterations: usize,

    pub logs_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
            max_stops_per_batch: DEFAULT_MAX_STOPS_PER_BATCH,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            breaker_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            breaker_recovery_secs: DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS,
            sequencer_max_iterations: DEFAULT_TWO_OPT_MAX_ITERATIONS,
            logs_dir: "./logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (process env, test maps)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let google_maps_api_key = lookup("GOOGLE_MAPS_API_KEY").filter(|key| !key.trim().is_empty());

        let directions_url = lookup("DIRECTIONS_BASE_URL").unwrap_or(defaults.directions_url);

        let max_stops_per_batch =
            parse_or(&lookup, "ROUTING_MAX_STOPS_PER_BATCH", defaults.max_stops_per_batch)?;
        if max_stops_per_batch == 0 {
            anyhow::bail!("ROUTING_MAX_STOPS_PER_BATCH must be at least 1");
        }

        let request_interval_ms = parse_or(&lookup, "ROUTING_REQUEST_INTERVAL_MS", defaults.request_interval_ms)?;
        let provider_timeout_secs = parse_or(&lookup, "ROUTING_TIMEOUT_SECS", defaults.provider_timeout_secs)?;
        let breaker_threshold = parse_or(&lookup, "ROUTING_CB_THRESHOLD", defaults.breaker_threshold)?;
        let breaker_recovery_secs = parse_or(&lookup, "ROUTING_CB_RECOVERY_SECS", defaults.breaker_recovery_secs)?;

        let sequencer_max_iterations =
            parse_or(&lookup, "SEQUENCER_MAX_ITERATIONS", defaults.sequencer_max_iterations)?;
        if sequencer_max_iterations == 0 {
            anyhow::bail!("SEQUENCER_MAX_ITERATIONS must be at least 1");
        }

        let logs_dir = lookup("LOGS_DIR").unwrap_or(defaults.logs_dir);

        Ok(Self {
            google_maps_api_key,
            directions_url,
            max_stops_per_batch,
            request_interval_ms,
            provider_timeout_secs,
            breaker_threshold,
            breaker_recovery_secs,
            sequencer_max_iterations,
            logs_dir,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
