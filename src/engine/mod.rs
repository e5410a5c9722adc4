//! Pure computation engine(s): pricing, premium quoting and trigger evaluation.

pub mod premium;
pub mod pricing;
pub mod trigger;

pub use premium::{PremiumCalculator, QuoteRequest};
pub use pricing::{
    normal_cdf, one_touch_value, touch_probability, vanilla_option_value, PricingError,
    TouchContract, TouchValuation, DAYS_PER_YEAR,
};
pub use trigger::{evaluate, TriggerEvaluation};
