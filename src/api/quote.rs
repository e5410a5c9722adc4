//! Premium quote endpoint.

use super::{AppState, JsonBody};
use crate::domain::{OptionType, Quote};
use crate::engine::premium::{
    QuoteRequest, DEFAULT_DAYS_TO_EXPIRATION, DEFAULT_RISK_FREE_RATE, DEFAULT_VOLATILITY,
};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBody {
    #[serde(default)]
    pub coverage_amount: f64,
    pub barrier_price: Option<f64>,
    /// Falls back to the monitor's latest observed price when absent.
    pub spot_price: Option<f64>,
    #[serde(alias = "optionType")]
    pub option_direction: Option<OptionType>,
    /// `YYYY-MM-DD`.
    pub expiration_date: Option<String>,
    pub volatility: Option<f64>,
    pub risk_free_rate: Option<f64>,
}

pub async fn post_quote(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<QuoteBody>,
) -> Result<Json<Quote>, AppError> {
    let spot_price = body
        .spot_price
        .or_else(|| state.observed_price().map(|o| o.price))
        .unwrap_or(0.0);

    let mut request = QuoteRequest::new(body.coverage_amount, body.barrier_price, spot_price)
        .with_volatility(body.volatility.unwrap_or(DEFAULT_VOLATILITY))
        .with_risk_free_rate(body.risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE))
        .with_days_to_expiration(days_until(
            body.expiration_date.as_deref(),
            Utc::now().date_naive(),
        ));
    if let Some(option_type) = body.option_direction {
        request = request.with_direction(option_type.direction());
    }

    let quote = state.calculator.quote(&request)?;
    debug!(
        spot = quote.spot_price,
        barrier = quote.barrier_or_strike,
        days = quote.days_to_expiration,
        premium = quote.premium,
        "quote issued"
    );

    Ok(Json(quote))
}

/// Whole days from `today` to an ISO date, floored at 0.
///
/// Missing or unparseable dates fall back to the default term.
pub fn days_until(expiration_date: Option<&str>, today: NaiveDate) -> i64 {
    expiration_date
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .map(|expiry| (expiry - today).num_days().max(0))
        .unwrap_or(DEFAULT_DAYS_TO_EXPIRATION)
}
