//! Payout abstraction: moves coverage to a policy holder's wallet.

use crate::domain::Wallet;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mock;

pub use mock::MockPayout;

/// Settlement collaborator. Transport is up to the implementation.
#[async_trait]
pub trait Payout: Send + Sync + fmt::Debug {
    /// Send `amount` to `destination`.
    async fn send(&self, destination: &Wallet, amount: f64) -> Result<PayoutReceipt, PayoutError>;
}

/// Proof of a completed payout.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutReceipt {
    pub reference: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayoutError {
    /// The settlement side refused the transfer (e.g. insufficient funds).
    #[error("payout rejected: {0}")]
    Rejected(String),
    /// The transfer could not be submitted.
    #[error("payout transport error: {0}")]
    Transport(String),
}

/// Payout that only records the transfer in the log.
///
/// Stands in for on-chain settlement, which lives outside this service.
#[derive(Debug, Clone, Default)]
pub struct LoggingPayout;

#[async_trait]
impl Payout for LoggingPayout {
    async fn send(&self, destination: &Wallet, amount: f64) -> Result<PayoutReceipt, PayoutError> {
        let reference = format!("log-{}", uuid::Uuid::new_v4());
        tracing::info!(
            destination = %destination,
            amount,
            reference = %reference,
            "payout recorded"
        );
        Ok(PayoutReceipt { reference, amount })
    }
}
