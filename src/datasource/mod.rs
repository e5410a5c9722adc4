//! Price feed abstraction for fetching the latest oracle price of one feed.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod pyth;

pub use mock::MockPriceFeed;
pub use pyth::PythPriceFeed;

/// Price feed trait for fetching the latest published price.
///
/// Implementations must handle retry/backoff for transient transport errors.
#[async_trait]
pub trait PriceFeed: Send + Sync + fmt::Debug {
    /// Fetch the most recent update for a feed.
    ///
    /// # Arguments
    /// * `feed_id` - Oracle feed identifier (hex, without `0x`)
    async fn fetch_latest(&self, feed_id: &str) -> Result<PriceUpdate, PriceFeedError>;
}

/// Raw oracle update: an integer mantissa scaled by a power of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceUpdate {
    pub price: i64,
    pub exponent: i32,
    /// Unix seconds.
    pub publish_time: i64,
}

impl PriceUpdate {
    pub fn new(price: i64, exponent: i32, publish_time: i64) -> Self {
        Self {
            price,
            exponent,
            publish_time,
        }
    }

    /// `price * 10^exponent`, e.g. 9_500_000_000_000 at exponent -8 is 95_000.
    ///
    /// Exponents past what `f64` can scale collapse to 0 or infinity, which
    /// the monitor rejects as an unusable price.
    pub fn normalized(&self) -> f64 {
        // Dividing by an exact power of ten keeps whole prices exact.
        match self.exponent.checked_neg() {
            Some(shift) if shift > 0 => self.price as f64 / 10f64.powi(shift),
            _ => self.price as f64 * 10f64.powi(self.exponent),
        }
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.publish_time, 0).single()
    }
}

/// Error type for price feed operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceFeedError {
    /// Connection timeout, DNS failure and the like.
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    /// The feed returned no update for the requested id.
    #[error("Feed not found: {0}")]
    NotFound(String),
    /// The latest update is older than the accepted age.
    #[error("Stale price: published {age_secs}s ago, limit {max_age_secs}s")]
    Stale { age_secs: i64, max_age_secs: i64 },
}
