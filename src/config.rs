use crate::domain::UnderlyingAsset;
use crate::engine::premium::DEFAULT_LOADING_FACTOR;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub price_feed_url: String,
    pub price_feed_id: String,
    pub monitor_asset: UnderlyingAsset,
    pub poll_interval_ms: u64,
    pub backoff_interval_ms: u64,
    pub max_price_age_secs: u64,
    pub closed_retention_secs: u64,
    pub loading_factor: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let price_feed_url = env_map
            .get("PRICE_FEED_URL")
            .cloned()
            .unwrap_or_else(|| "https://hermes.pyth.network".to_string());

        let monitor_asset = match env_map.get("MONITOR_ASSET") {
            Some(s) => s
                .parse::<UnderlyingAsset>()
                .map_err(|e| ConfigError::InvalidValue("MONITOR_ASSET".to_string(), e))?,
            None => UnderlyingAsset::Btc,
        };

        let price_feed_id = match env_map.get("PRICE_FEED_ID").map(|s| s.trim()) {
            Some("") => {
                return Err(ConfigError::InvalidValue(
                    "PRICE_FEED_ID".to_string(),
                    "must not be empty".to_string(),
                ))
            }
            Some(id) => id.trim_start_matches("0x").to_string(),
            None => monitor_asset.pyth_feed_id().to_string(),
        };

        let poll_interval_ms = parse_or(&env_map, "POLL_INTERVAL_MS", 5000u64, "must be a valid u64")?;
        let backoff_interval_ms =
            parse_or(&env_map, "BACKOFF_INTERVAL_MS", 10_000u64, "must be a valid u64")?;
        let max_price_age_secs =
            parse_or(&env_map, "MAX_PRICE_AGE_SECS", 60u64, "must be a valid u64")?;
        let closed_retention_secs =
            parse_or(&env_map, "CLOSED_RETENTION_SECS", 86_400u64, "must be a valid u64")?;

        let loading_factor = parse_or(
            &env_map,
            "LOADING_FACTOR",
            DEFAULT_LOADING_FACTOR,
            "must be a number",
        )?;
        if !loading_factor.is_finite() || loading_factor < 1.0 {
            return Err(ConfigError::InvalidValue(
                "LOADING_FACTOR".to_string(),
                format!("must be at least 1.0, got {}", loading_factor),
            ));
        }

        Ok(Config {
            port,
            price_feed_url,
            price_feed_id,
            monitor_asset,
            poll_interval_ms,
            backoff_interval_ms,
            max_price_age_secs,
            closed_retention_secs,
            loading_factor,
        })
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
        None => Ok(default),
    }
}
