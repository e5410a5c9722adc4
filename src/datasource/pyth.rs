//! Pyth Hermes price service client.

use super::{PriceFeed, PriceFeedError, PriceUpdate};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Oracle exponents seen in practice sit well inside this band.
const EXPONENT_RANGE: std::ops::RangeInclusive<i32> = -18..=18;

/// Price feed backed by the Hermes REST API.
#[derive(Debug, Clone)]
pub struct PythPriceFeed {
    client: Client,
    base_url: String,
    max_retry_elapsed: Duration,
}

impl PythPriceFeed {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retry_elapsed: Duration::from_secs(3),
        }
    }

    /// Create with the public Hermes endpoint.
    pub fn default_url() -> Self {
        Self::new("https://hermes.pyth.network".to_string())
    }

    /// Bound the time spent retrying one fetch before surfacing the error.
    pub fn with_max_retry_elapsed(mut self, max: Duration) -> Self {
        self.max_retry_elapsed = max;
        self
    }

    async fn get_latest(&self, feed_id: &str) -> Result<serde_json::Value, PriceFeedError> {
        let url = format!("{}/v2/updates/price/latest", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("ids[]", feed_id), ("parsed", "true")])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(PriceFeedError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(PriceFeedError::Http {
                    status: status.as_u16(),
                    message: "Retryable status".to_string(),
                }));
            }
            if status == 404 {
                return Err(backoff::Error::permanent(PriceFeedError::NotFound(
                    feed_id.to_string(),
                )));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceFeedError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(PriceFeedError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceFeed for PythPriceFeed {
    async fn fetch_latest(&self, feed_id: &str) -> Result<PriceUpdate, PriceFeedError> {
        debug!("Fetching latest price for feed={}", feed_id);
        let response = self.get_latest(feed_id).await?;
        parse_latest(&response, feed_id)
    }
}

fn parse_latest(json: &serde_json::Value, feed_id: &str) -> Result<PriceUpdate, PriceFeedError> {
    let wanted = feed_id.trim_start_matches("0x");
    let entries = json
        .get("parsed")
        .and_then(|v| v.as_array())
        .ok_or_else(|| PriceFeedError::Parse("Missing parsed array".to_string()))?;

    let entry = entries
        .iter()
        .find(|e| {
            e.get("id")
                .and_then(|v| v.as_str())
                .map(|id| id.trim_start_matches("0x").eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
        })
        .ok_or_else(|| PriceFeedError::NotFound(feed_id.to_string()))?;

    let price = entry
        .get("price")
        .ok_or_else(|| PriceFeedError::Parse("Missing price object".to_string()))?;

    // Hermes encodes the mantissa as a string to preserve 64-bit precision.
    let mantissa = match price.get("price") {
        Some(serde_json::Value::String(s)) => s
            .parse::<i64>()
            .map_err(|e| PriceFeedError::Parse(format!("Invalid price: {}", e)))?,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| PriceFeedError::Parse("Invalid price".to_string()))?,
        None => return Err(PriceFeedError::Parse("Missing price field".to_string())),
    };

    let exponent = price
        .get("expo")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| PriceFeedError::Parse("Missing expo field".to_string()))?;
    let exponent = i32::try_from(exponent)
        .ok()
        .filter(|e| EXPONENT_RANGE.contains(e))
        .ok_or_else(|| PriceFeedError::Parse(format!("Exponent out of range: {}", exponent)))?;

    let publish_time = price
        .get("publish_time")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| PriceFeedError::Parse("Missing publish_time field".to_string()))?;

    Ok(PriceUpdate::new(mantissa, exponent, publish_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: &str = "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43";

    #[test]
    fn test_parse_latest_valid() {
        let json = serde_json::json!({
            "binary": { "encoding": "hex", "data": [] },
            "parsed": [{
                "id": BTC,
                "price": {
                    "price": "9500000000000",
                    "conf": "3500000000",
                    "expo": -8,
                    "publish_time": 1700000000
                },
                "ema_price": {
                    "price": "9490000000000",
                    "conf": "3400000000",
                    "expo": -8,
                    "publish_time": 1700000000
                }
            }]
        });

        let update = parse_latest(&json, BTC).unwrap();
        assert_eq!(update.price, 9_500_000_000_000);
        assert_eq!(update.exponent, -8);
        assert_eq!(update.publish_time, 1_700_000_000);
        assert!((update.normalized() - 95_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_latest_accepts_prefixed_id() {
        let json = serde_json::json!({
            "parsed": [{
                "id": BTC,
                "price": { "price": 13500, "expo": -2, "publish_time": 1 }
            }]
        });
        let update = parse_latest(&json, &format!("0x{}", BTC)).unwrap();
        assert!((update.normalized() - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_latest_missing_feed() {
        let json = serde_json::json!({ "parsed": [] });
        assert!(matches!(
            parse_latest(&json, BTC),
            Err(PriceFeedError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_latest_malformed() {
        let json = serde_json::json!({
            "parsed": [{ "id": BTC, "price": { "price": "abc", "expo": -8, "publish_time": 1 } }]
        });
        assert!(matches!(parse_latest(&json, BTC), Err(PriceFeedError::Parse(_))));

        let json = serde_json::json!({ "unexpected": true });
        assert!(matches!(parse_latest(&json, BTC), Err(PriceFeedError::Parse(_))));
    }

    #[test]
    fn test_parse_latest_rejects_out_of_range_exponent() {
        for expo in [i64::from(i32::MIN), -19, 19, 1 << 40] {
            let json = serde_json::json!({
                "parsed": [{ "id": BTC, "price": { "price": "1", "expo": expo, "publish_time": 1 } }]
            });
            assert!(
                matches!(parse_latest(&json, BTC), Err(PriceFeedError::Parse(_))),
                "expo {expo} accepted"
            );
        }

        let json = serde_json::json!({
            "parsed": [{ "id": BTC, "price": { "price": "1", "expo": -18, "publish_time": 1 } }]
        });
        assert!(parse_latest(&json, BTC).is_ok());
    }
}
