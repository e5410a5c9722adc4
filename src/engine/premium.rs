//! Premium quoting for one-touch liquidation protection.

use super::pricing::{
    one_touch_value, vanilla_option_value, PricingError, TouchContract, TouchValuation,
    DAYS_PER_YEAR,
};
use crate::domain::{Direction, OptionType, Quote};
use tracing::debug;

pub const DEFAULT_VOLATILITY: f64 = 0.30;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;
pub const DEFAULT_DAYS_TO_EXPIRATION: i64 = 30;
/// House margin applied on top of the fair value.
pub const DEFAULT_LOADING_FACTOR: f64 = 1.20;
/// Barrier used when none is requested: 10% out-of-the-money protection.
pub const DEFAULT_BARRIER_RATIO: f64 = 0.9;
/// Share of coverage charged when the barrier is already breached.
pub const BREACHED_PAYOUT_RATIO: f64 = 0.95;

/// Parameters for a single quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub coverage_amount: f64,
    /// Unset or non-positive falls back to `DEFAULT_BARRIER_RATIO * spot`.
    pub barrier_price: Option<f64>,
    pub spot_price: f64,
    /// Requested trigger side. Inferred from barrier vs spot when unset.
    pub direction: Option<Direction>,
    pub volatility: f64,
    pub risk_free_rate: f64,
    pub days_to_expiration: i64,
}

impl QuoteRequest {
    pub fn new(coverage_amount: f64, barrier_price: Option<f64>, spot_price: f64) -> Self {
        Self {
            coverage_amount,
            barrier_price,
            spot_price,
            direction: None,
            volatility: DEFAULT_VOLATILITY,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            days_to_expiration: DEFAULT_DAYS_TO_EXPIRATION,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn with_days_to_expiration(mut self, days: i64) -> Self {
        self.days_to_expiration = days;
        self
    }
}

/// Stateless premium calculator. Identical requests always yield identical quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PremiumCalculator {
    loading_factor: f64,
    days_per_year: f64,
}

impl Default for PremiumCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_LOADING_FACTOR)
    }
}

impl PremiumCalculator {
    pub fn new(loading_factor: f64) -> Self {
        Self {
            loading_factor,
            days_per_year: DAYS_PER_YEAR,
        }
    }

    pub fn loading_factor(&self) -> f64 {
        self.loading_factor
    }

    /// Price a one-touch protection contract and apply the loading factor.
    ///
    /// # Errors
    /// `InvalidInput` when coverage or spot is not a positive finite number.
    /// Barrier and parameter edge cases never fail; they map to fallback values.
    pub fn quote(&self, request: &QuoteRequest) -> Result<Quote, PricingError> {
        if !request.coverage_amount.is_finite() || request.coverage_amount <= 0.0 {
            return Err(PricingError::InvalidInput(
                "coverage amount must be greater than 0".to_string(),
            ));
        }
        if !request.spot_price.is_finite() || request.spot_price <= 0.0 {
            return Err(PricingError::InvalidInput(
                "spot price must be greater than 0".to_string(),
            ));
        }
        if !request.volatility.is_finite() || !request.risk_free_rate.is_finite() {
            return Err(PricingError::InvalidInput(
                "volatility and risk-free rate must be finite".to_string(),
            ));
        }

        let spot = request.spot_price;
        let barrier = match request.barrier_price {
            Some(b) if b.is_finite() && b > 0.0 => b,
            _ => spot * DEFAULT_BARRIER_RATIO,
        };
        let days = request.days_to_expiration.max(0);
        let direction = request
            .direction
            .or_else(|| Direction::infer(spot, barrier))
            .unwrap_or(Direction::Below);

        let contract = TouchContract {
            spot,
            barrier,
            days_to_expiry: days as f64,
            coverage: request.coverage_amount,
            volatility: request.volatility,
            risk_free_rate: request.risk_free_rate,
            direction: Some(direction),
        };

        let valuation = match one_touch_value(&contract, self.days_per_year) {
            Ok(valuation) => valuation,
            Err(PricingError::InvalidBarrier { .. }) => {
                debug!(spot, barrier, %direction, "barrier already breached, pricing near-certain payout");
                TouchValuation {
                    probability: 1.0,
                    value: BREACHED_PAYOUT_RATIO * request.coverage_amount,
                }
            }
            Err(PricingError::InvalidParameter(reason)) => {
                debug!(%reason, "no time or volatility left to touch, pricing at zero");
                TouchValuation {
                    probability: 0.0,
                    value: 0.0,
                }
            }
            Err(e @ PricingError::InvalidInput(_)) => return Err(e),
        };

        let years = days as f64 / self.days_per_year;
        let vanilla_put = vanilla_option_value(
            spot,
            barrier,
            years,
            request.volatility,
            request.risk_free_rate,
            OptionType::Put,
        );

        Ok(Quote {
            premium: round4(valuation.value * self.loading_factor),
            touch_or_option_value: round4(valuation.value),
            touch_probability: valuation.probability,
            barrier_or_strike: barrier,
            direction,
            spot_price: spot,
            coverage_amount: request.coverage_amount,
            days_to_expiration: days,
            volatility: request.volatility,
            risk_free_rate: request.risk_free_rate,
            vanilla_put_value: round4(vanilla_put),
        })
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
