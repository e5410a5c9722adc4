//! Policy lifecycle types.

use super::primitives::{Direction, PolicyId, UnderlyingAsset, Wallet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a policy. Transitions only away from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    /// Monitored; the only state the monitor evaluates.
    Active,
    /// Paid out after the barrier was crossed.
    Resolved,
    /// Reached expiry without a trigger; closed without payout.
    Expired,
}

impl PolicyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PolicyStatus::Active)
    }
}

/// Registration request for a paid policy, before the store assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicy {
    pub asset: UnderlyingAsset,
    pub barrier_price: f64,
    pub direction: Direction,
    pub coverage_amount: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    pub days_to_expiration: i64,
    pub user_wallet: Option<Wallet>,
    pub premium_paid: bool,
    pub premium: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A monitored insurance contract, owned by the policy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub asset: UnderlyingAsset,
    pub barrier_price: f64,
    pub direction: Direction,
    pub coverage_amount: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    pub days_to_expiration: i64,
    pub user_wallet: Wallet,
    pub premium_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium: Option<f64>,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub payout_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_reference: Option<String>,
    pub payout_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payout_error: Option<String>,
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// Strict crossing test: a price equal to the barrier never triggers.
    pub fn is_triggered_by(&self, price: f64) -> bool {
        match self.direction {
            Direction::Above => price > self.barrier_price,
            Direction::Below => price < self.barrier_price,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// When the policy left the active state, if it has.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            PolicyStatus::Active => None,
            PolicyStatus::Resolved => self.resolved_at,
            PolicyStatus::Expired => self.expires_at,
        }
    }
}
