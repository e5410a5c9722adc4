use crate::domain::{Policy, PolicyId, PolicyStatus};
use crate::payout::{Payout, PayoutError};
use crate::store::{Claim, MarkOutcome, PolicyStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Pays out triggered policies and records the ACTIVE -> RESOLVED transition.
///
/// Payout is at-least-once: a failed send leaves the policy active for the next
/// trigger. The transition itself happens exactly once, guarded by the store.
#[derive(Debug, Clone)]
pub struct ResolutionHandler {
    store: Arc<PolicyStore>,
    payout: Arc<dyn Payout>,
}

impl ResolutionHandler {
    pub fn new(store: Arc<PolicyStore>, payout: Arc<dyn Payout>) -> Self {
        Self { store, payout }
    }

    /// Resolve a triggered policy observed at `observed_price`.
    ///
    /// Concurrent calls for one policy collapse to a single payout: the first
    /// caller claims it, the rest get `InFlight` or `AlreadyClosed`.
    pub async fn resolve(
        &self,
        policy_id: &PolicyId,
        observed_price: f64,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let policy = match self.store.claim(policy_id) {
            Claim::Claimed(policy) => policy,
            Claim::InFlight => return Ok(ResolutionOutcome::InFlight),
            Claim::Closed(status) => return Ok(ResolutionOutcome::AlreadyClosed(status)),
            Claim::NotFound => return Err(ResolutionError::NotFound(*policy_id)),
        };

        info!(
            policy_id = %policy.id,
            observed_price,
            barrier = policy.barrier_price,
            direction = %policy.direction,
            "policy triggered, sending payout"
        );

        let receipt = match self
            .payout
            .send(&policy.user_wallet, policy.coverage_amount)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(policy_id = %policy.id, error = %e, "payout failed, policy stays active");
                self.store.release_failed(policy_id, &e.to_string());
                return Err(ResolutionError::Payout {
                    policy_id: *policy_id,
                    source: e,
                });
            }
        };

        match self.store.mark_resolved(
            policy_id,
            receipt.amount,
            Utc::now(),
            Some(receipt.reference.clone()),
        )? {
            MarkOutcome::Resolved(resolved) => {
                info!(
                    policy_id = %resolved.id,
                    payout = receipt.amount,
                    reference = %receipt.reference,
                    "policy resolved"
                );
                Ok(ResolutionOutcome::Resolved(resolved))
            }
            MarkOutcome::AlreadyClosed(closed) => {
                warn!(
                    policy_id = %closed.id,
                    status = ?closed.status,
                    "payout sent for a policy that was already closed"
                );
                Ok(ResolutionOutcome::AlreadyClosed(closed.status))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// This call paid out and resolved the policy.
    Resolved(Policy),
    /// Another resolution of the same policy is in progress.
    InFlight,
    AlreadyClosed(PolicyStatus),
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("policy {0} not found")]
    NotFound(PolicyId),
    #[error("payout for policy {policy_id} failed: {source}")]
    Payout {
        policy_id: PolicyId,
        #[source]
        source: PayoutError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
