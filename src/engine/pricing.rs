//! Closed-form valuation: standard normal CDF, vanilla options, one-touch barriers.
//!
//! Touch probabilities assume a driftless log-normal diffusion and use the
//! reflection principle for Brownian motion, so the probability of reaching a
//! barrier before expiry is twice the probability of finishing beyond it.

use crate::domain::{Direction, OptionType};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;
use thiserror::Error;

/// Day-count basis used to convert days to year fractions.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("barrier {barrier} is on the wrong side of spot {spot} for direction {direction}")]
    InvalidBarrier {
        spot: f64,
        barrier: f64,
        direction: Direction,
    },
    #[error("invalid pricing parameter: {0}")]
    InvalidParameter(String),
}

/// Standard normal cumulative distribution.
///
/// Evaluated through the complementary error function so the lower tail keeps
/// full relative precision instead of cancelling against 1.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Black-Scholes value of a European call or put.
///
/// Non-positive spot, strike or time to expiry are defined no-value cases and
/// return 0. Zero volatility collapses to the discounted intrinsic value.
pub fn vanilla_option_value(
    spot: f64,
    strike: f64,
    years_to_expiry: f64,
    volatility: f64,
    risk_free_rate: f64,
    option_type: OptionType,
) -> f64 {
    if years_to_expiry <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }

    let discounted_strike = strike * (-risk_free_rate * years_to_expiry).exp();

    if volatility <= 0.0 {
        let intrinsic = match option_type {
            OptionType::Call => spot - discounted_strike,
            OptionType::Put => discounted_strike - spot,
        };
        return intrinsic.max(0.0);
    }

    let sigma_sqrt_t = volatility * years_to_expiry.sqrt();
    let d1 = ((spot / strike).ln() + (risk_free_rate + 0.5 * volatility * volatility) * years_to_expiry)
        / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;

    let value = match option_type {
        OptionType::Call => spot * normal_cdf(d1) - discounted_strike * normal_cdf(d2),
        OptionType::Put => discounted_strike * normal_cdf(-d2) - spot * normal_cdf(-d1),
    };

    value.max(0.0)
}

/// Probability that the price path touches `barrier` before expiry.
///
/// The barrier must lie strictly on the side of spot named by `direction`;
/// a barrier equal to spot is an immediate touch and is handled by callers.
pub fn touch_probability(
    spot: f64,
    barrier: f64,
    years_to_expiry: f64,
    volatility: f64,
    direction: Direction,
) -> Result<f64, PricingError> {
    if !(spot > 0.0) || !(barrier > 0.0) {
        return Err(PricingError::InvalidParameter(format!(
            "spot ({}) and barrier ({}) must be positive",
            spot, barrier
        )));
    }

    let correct_side = match direction {
        Direction::Below => barrier < spot,
        Direction::Above => barrier > spot,
    };
    if !correct_side {
        return Err(PricingError::InvalidBarrier {
            spot,
            barrier,
            direction,
        });
    }

    if !(years_to_expiry > 0.0) {
        return Err(PricingError::InvalidParameter(format!(
            "years to expiry must be positive, got {}",
            years_to_expiry
        )));
    }
    if !(volatility > 0.0) {
        return Err(PricingError::InvalidParameter(format!(
            "volatility must be positive, got {}",
            volatility
        )));
    }

    let z = (barrier / spot).ln() / (volatility * years_to_expiry.sqrt());
    let probability = match direction {
        Direction::Below => 2.0 * normal_cdf(z),
        Direction::Above => 2.0 * normal_cdf(-z),
    };

    Ok(probability.clamp(0.0, 1.0))
}

/// Inputs for valuing a one-touch contract paying `coverage` on first touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchContract {
    pub spot: f64,
    pub barrier: f64,
    pub days_to_expiry: f64,
    pub coverage: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    /// Required trigger side. `None` infers it from where the barrier sits.
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchValuation {
    pub probability: f64,
    pub value: f64,
}

/// Discounted expected payout of a one-touch contract.
///
/// Discounts over the full term; no refinement for touching early.
pub fn one_touch_value(
    contract: &TouchContract,
    days_per_year: f64,
) -> Result<TouchValuation, PricingError> {
    if !(days_per_year > 0.0) || contract.days_to_expiry < 0.0 {
        return Err(PricingError::InvalidParameter(format!(
            "cannot convert {} days on a {} day basis",
            contract.days_to_expiry, days_per_year
        )));
    }
    let years = contract.days_to_expiry / days_per_year;

    let probability = if contract.barrier == contract.spot {
        1.0
    } else {
        let direction = match contract.direction {
            Some(direction) => direction,
            None => Direction::infer(contract.spot, contract.barrier).ok_or_else(|| {
                PricingError::InvalidParameter("barrier and spot are not comparable".to_string())
            })?,
        };
        touch_probability(
            contract.spot,
            contract.barrier,
            years,
            contract.volatility,
            direction,
        )?
    };

    let discount = (-contract.risk_free_rate * years).exp();
    // A negative rate must not push the value above the payout itself.
    let value = (contract.coverage * discount * probability).clamp(0.0, contract.coverage.max(0.0));

    Ok(TouchValuation { probability, value })
}
