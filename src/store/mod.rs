//! In-memory policy registry.
//!
//! Every read and write goes through one mutex. Callers receive copies, never
//! references into the registry, and the lock is never held across I/O.

use crate::domain::{NewPolicy, Policy, PolicyId, PolicyStatus};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("policy not payable: {0}")]
    PolicyNotPayable(String),
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("policy {0} not found")]
    NotFound(PolicyId),
    #[error("policy {0} is being resolved")]
    InFlight(PolicyId),
}

/// Outcome of claiming a policy for resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The caller now owns the in-flight resolution of this policy.
    Claimed(Policy),
    /// Another caller is already resolving it.
    InFlight,
    /// The policy has left the active state.
    Closed(PolicyStatus),
    NotFound,
}

/// Outcome of `mark_resolved`.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    /// This call performed the ACTIVE -> RESOLVED transition.
    Resolved(Policy),
    /// The policy was already terminal; nothing changed.
    AlreadyClosed(Policy),
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Keyed by id, iterated in registration order.
    policies: IndexMap<PolicyId, Policy>,
    in_flight: HashSet<PolicyId>,
}

#[derive(Debug, Default)]
pub struct PolicyStore {
    inner: Mutex<StoreInner>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paid policy and activate it.
    ///
    /// # Errors
    /// `PolicyNotPayable` without a wallet, an unpaid premium or a positive
    /// barrier; `InvalidPolicy` for a non-positive coverage amount.
    pub fn add(&self, new: NewPolicy) -> Result<Policy, StoreError> {
        let user_wallet = match new.user_wallet {
            Some(wallet) if !wallet.is_blank() => wallet,
            _ => {
                return Err(StoreError::PolicyNotPayable(
                    "user wallet is required".to_string(),
                ))
            }
        };
        if !new.premium_paid {
            return Err(StoreError::PolicyNotPayable(
                "premium has not been paid".to_string(),
            ));
        }
        if !new.barrier_price.is_finite() || new.barrier_price <= 0.0 {
            return Err(StoreError::PolicyNotPayable(
                "barrier price must be greater than 0".to_string(),
            ));
        }
        if !new.coverage_amount.is_finite() || new.coverage_amount <= 0.0 {
            return Err(StoreError::InvalidPolicy(
                "coverage amount must be greater than 0".to_string(),
            ));
        }

        let policy = Policy {
            id: PolicyId::generate(),
            asset: new.asset,
            barrier_price: new.barrier_price,
            direction: new.direction,
            coverage_amount: new.coverage_amount,
            volatility: new.volatility,
            risk_free_rate: new.risk_free_rate,
            days_to_expiration: new.days_to_expiration,
            user_wallet,
            premium_paid: true,
            premium: new.premium,
            status: PolicyStatus::Active,
            created_at: Utc::now(),
            expires_at: new.expires_at,
            resolved_at: None,
            payout_amount: None,
            payout_reference: None,
            payout_failures: 0,
            last_payout_error: None,
        };

        self.inner.lock().policies.insert(policy.id, policy.clone());
        info!(
            policy_id = %policy.id,
            asset = %policy.asset,
            barrier = policy.barrier_price,
            direction = %policy.direction,
            coverage = policy.coverage_amount,
            "policy registered"
        );

        Ok(policy)
    }

    /// Point-in-time copy of all active policies in registration order.
    pub fn snapshot_active(&self) -> Vec<Policy> {
        self.inner
            .lock()
            .policies
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &PolicyId) -> Option<Policy> {
        self.inner.lock().policies.get(id).cloned()
    }

    /// Delete a policy.
    ///
    /// # Errors
    /// `InFlight` while a resolution holds the claim; the payout may already
    /// be on its way, so the record must survive until `mark_resolved` or
    /// `release_failed` runs.
    pub fn remove(&self, id: &PolicyId) -> Result<Policy, StoreError> {
        let mut inner = self.inner.lock();
        if inner.in_flight.contains(id) {
            return Err(StoreError::InFlight(*id));
        }
        inner
            .policies
            .shift_remove(id)
            .ok_or(StoreError::NotFound(*id))
    }

    pub fn count(&self) -> usize {
        self.inner.lock().policies.len()
    }

    pub fn count_active(&self) -> usize {
        self.inner
            .lock()
            .policies
            .values()
            .filter(|p| p.is_active())
            .count()
    }

    /// Mark an active policy as in-flight so only one caller pays it out.
    pub fn claim(&self, id: &PolicyId) -> Claim {
        let mut inner = self.inner.lock();
        let policy = match inner.policies.get(id) {
            Some(policy) => policy.clone(),
            None => return Claim::NotFound,
        };
        if policy.status.is_terminal() {
            return Claim::Closed(policy.status);
        }
        if !inner.in_flight.insert(*id) {
            return Claim::InFlight;
        }
        Claim::Claimed(policy)
    }

    /// Drop an in-flight claim after a failed payout, leaving the policy active.
    pub fn release_failed(&self, id: &PolicyId, reason: &str) -> Option<Policy> {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(id);
        let policy = inner.policies.get_mut(id)?;
        if policy.is_active() {
            policy.payout_failures += 1;
            policy.last_payout_error = Some(reason.to_string());
        }
        Some(policy.clone())
    }

    /// Transition ACTIVE -> RESOLVED. Idempotent: a terminal policy is left untouched.
    pub fn mark_resolved(
        &self,
        id: &PolicyId,
        payout_amount: f64,
        resolved_at: DateTime<Utc>,
        payout_reference: Option<String>,
    ) -> Result<MarkOutcome, StoreError> {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(id);
        let policy = inner
            .policies
            .get_mut(id)
            .ok_or(StoreError::NotFound(*id))?;

        if policy.status.is_terminal() {
            return Ok(MarkOutcome::AlreadyClosed(policy.clone()));
        }

        policy.status = PolicyStatus::Resolved;
        policy.resolved_at = Some(resolved_at);
        policy.payout_amount = Some(payout_amount);
        policy.payout_reference = payout_reference;
        policy.last_payout_error = None;

        Ok(MarkOutcome::Resolved(policy.clone()))
    }

    /// Close every active, unclaimed policy whose expiry is at or before `now`.
    pub fn expire_due(&self, now: DateTime<Utc>) -> Vec<Policy> {
        let mut inner = self.inner.lock();
        let StoreInner {
            policies,
            in_flight,
        } = &mut *inner;

        policies
            .values_mut()
            .filter(|p| p.is_active() && p.is_expired_at(now) && !in_flight.contains(&p.id))
            .map(|p| {
                p.status = PolicyStatus::Expired;
                p.clone()
            })
            .collect()
    }

    /// Drop resolved and expired policies that closed before `cutoff`.
    ///
    /// Returns the number of records removed.
    pub fn prune_closed(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.policies.len();
        inner
            .policies
            .retain(|_, p| !p.closed_at().is_some_and(|closed| closed < cutoff));
        before - inner.policies.len()
    }
}
