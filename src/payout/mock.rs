//! Recording payout for tests.

use super::{Payout, PayoutError, PayoutReceipt};
use crate::domain::Wallet;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<(Wallet, f64)>,
    failures_left: usize,
}

/// Payout that records every successful transfer and can fail on demand.
#[derive(Debug, Default)]
pub struct MockPayout {
    state: Mutex<MockState>,
    delay: Option<Duration>,
}

impl MockPayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends with a transport error.
    pub fn failing(self, count: usize) -> Self {
        self.state.lock().failures_left = count;
        self
    }

    /// Hold each send for `delay` before completing, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Successful transfers in send order.
    pub fn sent(&self) -> Vec<(Wallet, f64)> {
        self.state.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }
}

#[async_trait]
impl Payout for MockPayout {
    async fn send(&self, destination: &Wallet, amount: f64) -> Result<PayoutReceipt, PayoutError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(PayoutError::Transport("mock failure".to_string()));
        }
        state.sent.push((destination.clone(), amount));
        Ok(PayoutReceipt {
            reference: format!("mock-{}", state.sent.len()),
            amount,
        })
    }
}
