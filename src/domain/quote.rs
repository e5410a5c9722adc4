use super::primitives::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priced premium for a one-touch protection contract. Pure output, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub premium: f64,
    pub touch_or_option_value: f64,
    pub touch_probability: f64,
    pub barrier_or_strike: f64,
    pub direction: Direction,
    pub spot_price: f64,
    pub coverage_amount: f64,
    pub days_to_expiration: i64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    /// Vanilla put at the same strike; informational only.
    pub vanilla_put_value: f64,
}

/// Latest normalized price seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedPrice {
    pub price: f64,
    pub published_at: DateTime<Utc>,
}
