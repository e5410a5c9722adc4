//! Mock price feed for testing without network calls.

use super::{PriceFeed, PriceFeedError, PriceUpdate};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Scripted {
    /// Normalized price, published at fetch time.
    Price(f64),
    Update(PriceUpdate),
    Fail(PriceFeedError),
}

#[derive(Debug, Default)]
struct MockState {
    queue: VecDeque<Scripted>,
    current: Option<Scripted>,
    calls: usize,
}

/// Mock feed that replays a script of responses, then repeats the last one.
#[derive(Debug, Default)]
pub struct MockPriceFeed {
    state: Mutex<MockState>,
}

impl MockPriceFeed {
    /// Create a new mock feed with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh price to the script.
    pub fn with_price(self, price: f64) -> Self {
        self.push(Scripted::Price(price));
        self
    }

    /// Append a raw update (e.g. one with an old publish time).
    pub fn with_update(self, update: PriceUpdate) -> Self {
        self.push(Scripted::Update(update));
        self
    }

    /// Append a failed fetch to the script.
    pub fn with_failure(self, error: PriceFeedError) -> Self {
        self.push(Scripted::Fail(error));
        self
    }

    /// Append a fresh price while the feed is shared.
    pub fn push_price(&self, price: f64) {
        self.push(Scripted::Price(price));
    }

    pub fn push_failure(&self, error: PriceFeedError) {
        self.push(Scripted::Fail(error));
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    fn push(&self, item: Scripted) {
        self.state.lock().queue.push_back(item);
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    async fn fetch_latest(&self, feed_id: &str) -> Result<PriceUpdate, PriceFeedError> {
        let scripted = {
            let mut state = self.state.lock();
            state.calls += 1;
            if let Some(next) = state.queue.pop_front() {
                state.current = Some(next);
            }
            state.current.clone()
        };

        match scripted {
            Some(Scripted::Price(price)) => Ok(PriceUpdate::new(
                (price * 1e8).round() as i64,
                -8,
                Utc::now().timestamp(),
            )),
            Some(Scripted::Update(update)) => Ok(update),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(PriceFeedError::NotFound(feed_id.to_string())),
        }
    }
}
