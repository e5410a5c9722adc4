//! Domain types for liquidation protection policies.
//!
//! This module provides:
//! - Identity and direction primitives: PolicyId, Wallet, Direction, OptionType, UnderlyingAsset
//! - The Policy record and its registration request
//! - Quote and ObservedPrice value types

pub mod policy;
pub mod primitives;
pub mod quote;

pub use policy::{NewPolicy, Policy, PolicyStatus};
pub use primitives::{Direction, OptionType, PolicyId, UnderlyingAsset, Wallet};
pub use quote::{ObservedPrice, Quote};
