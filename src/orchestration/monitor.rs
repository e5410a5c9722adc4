//! Liquidation monitor: poll the price feed, evaluate policies, resolve triggers.

use crate::config::Config;
use crate::datasource::{PriceFeed, PriceFeedError};
use crate::domain::{ObservedPrice, UnderlyingAsset};
use crate::engine::trigger;
use crate::orchestration::resolution::{ResolutionError, ResolutionHandler, ResolutionOutcome};
use crate::store::{PolicyStore, StoreError};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub feed_id: String,
    pub asset: UnderlyingAsset,
    pub poll_interval: Duration,
    /// Sleep after a failed cycle instead of `poll_interval`.
    pub backoff_interval: Duration,
    pub max_price_age: Duration,
    /// How long resolved and expired policies stay readable before pruning.
    pub closed_retention: Duration,
}

impl MonitorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feed_id: config.price_feed_id.clone(),
            asset: config.monitor_asset,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            backoff_interval: Duration::from_millis(config.backoff_interval_ms),
            max_price_age: Duration::from_secs(config.max_price_age_secs),
            closed_retention: Duration::from_secs(config.closed_retention_secs),
        }
    }
}

/// What one successful poll cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub price: f64,
    pub evaluated: usize,
    pub triggered: usize,
    pub resolved: usize,
    /// Triggered but already in flight or closed by another caller.
    pub skipped: usize,
    pub failed: usize,
    pub expired: usize,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("price feed unavailable: {0}")]
    FeedUnavailable(#[from] PriceFeedError),
    #[error("feed returned an unusable price: {0}")]
    InvalidPrice(f64),
}

/// Background task that drives active policies to resolution.
pub struct LiquidationMonitor {
    feed: Arc<dyn PriceFeed>,
    store: Arc<PolicyStore>,
    resolver: Arc<ResolutionHandler>,
    config: MonitorConfig,
    latest_price: watch::Sender<Option<ObservedPrice>>,
}

impl LiquidationMonitor {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        store: Arc<PolicyStore>,
        resolver: Arc<ResolutionHandler>,
        config: MonitorConfig,
    ) -> Self {
        let (latest_price, _) = watch::channel(None);
        Self {
            feed,
            store,
            resolver,
            config,
            latest_price,
        }
    }

    /// Receiver for the latest observed price; `None` until the first good poll.
    pub fn subscribe(&self) -> watch::Receiver<Option<ObservedPrice>> {
        self.latest_price.subscribe()
    }

    /// Run one fetch → evaluate → resolve cycle.
    ///
    /// A feed failure returns before any policy is touched.
    pub async fn poll_once(&self) -> Result<CycleReport, MonitorError> {
        let update = self.feed.fetch_latest(&self.config.feed_id).await?;

        let price = update.normalized();
        if !price.is_finite() || price <= 0.0 {
            return Err(MonitorError::InvalidPrice(price));
        }

        let now = Utc::now();
        let published_at = update.published_at().ok_or_else(|| {
            PriceFeedError::Parse(format!("publish time out of range: {}", update.publish_time))
        })?;
        let age_secs = (now - published_at).num_seconds();
        let max_age_secs = self.config.max_price_age.as_secs() as i64;
        if age_secs > max_age_secs {
            return Err(PriceFeedError::Stale {
                age_secs,
                max_age_secs,
            }
            .into());
        }

        self.latest_price.send_replace(Some(ObservedPrice {
            price,
            published_at,
        }));

        let mut report = CycleReport {
            price,
            ..Default::default()
        };

        for policy in self.store.expire_due(now) {
            info!(policy_id = %policy.id, expires_at = ?policy.expires_at, "policy expired without payout");
            report.expired += 1;
        }

        let cutoff = chrono::Duration::from_std(self.config.closed_retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention));
        if let Some(cutoff) = cutoff {
            let pruned = self.store.prune_closed(cutoff);
            if pruned > 0 {
                debug!(pruned, "pruned closed policies");
            }
        }

        let evaluation = trigger::evaluate(self.store.snapshot_active(), self.config.asset, price);
        report.evaluated = evaluation.evaluated;
        report.triggered = evaluation.triggered.len();

        let outcomes = join_all(
            evaluation
                .triggered
                .iter()
                .map(|policy| self.resolver.resolve(&policy.id, price)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                Ok(ResolutionOutcome::Resolved(_)) => report.resolved += 1,
                Ok(ResolutionOutcome::InFlight) | Ok(ResolutionOutcome::AlreadyClosed(_)) => {
                    report.skipped += 1
                }
                // Removed between snapshot and claim.
                Err(ResolutionError::NotFound(_))
                | Err(ResolutionError::Store(StoreError::NotFound(_))) => report.skipped += 1,
                Err(e) => {
                    warn!(error = %e, "resolution failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Sleeps `poll_interval` after a clean cycle and `backoff_interval` after a
    /// feed error or any failed payout. Cancellation is honoured between
    /// cycles and during the sleep.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            feed_id = %self.config.feed_id,
            asset = %self.config.asset,
            "liquidation monitor started"
        );

        while !shutdown.is_cancelled() {
            let delay = match self.poll_once().await {
                Ok(report) if report.failed == 0 => {
                    debug!(
                        price = report.price,
                        evaluated = report.evaluated,
                        triggered = report.triggered,
                        resolved = report.resolved,
                        "poll cycle complete"
                    );
                    self.config.poll_interval
                }
                Ok(report) => {
                    warn!(failed = report.failed, "payouts failed this cycle, backing off");
                    self.config.backoff_interval
                }
                Err(e) => {
                    warn!(error = %e, "poll cycle failed, backing off");
                    self.config.backoff_interval
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("liquidation monitor stopped");
    }
}
