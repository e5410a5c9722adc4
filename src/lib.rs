pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod payout;
pub mod store;

pub use config::Config;
pub use datasource::{MockPriceFeed, PriceFeed, PriceFeedError, PriceUpdate, PythPriceFeed};
pub use domain::{
    Direction, NewPolicy, ObservedPrice, OptionType, Policy, PolicyId, PolicyStatus, Quote,
    UnderlyingAsset, Wallet,
};
pub use engine::{PremiumCalculator, PricingError, QuoteRequest};
pub use error::AppError;
pub use orchestration::{LiquidationMonitor, MonitorConfig, ResolutionHandler};
pub use payout::{LoggingPayout, MockPayout, Payout, PayoutError, PayoutReceipt};
pub use store::{PolicyStore, StoreError};
