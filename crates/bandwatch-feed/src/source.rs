//! Tick source contract and the replay source.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use bandwatch_core::Price;

use crate::error::FeedResult;

/// Channel capacity for a single subscription.
const SUBSCRIPTION_BUFFER: usize = 256;

/// One raw price update from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub price: Price,
    /// Timestamp when the update was received from the source.
    pub received_at: DateTime<Utc>,
}

impl Tick {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            received_at: Utc::now(),
        }
    }
}

/// A provider of live price updates.
///
/// Each `connect` call opens a fresh subscription producing a lazy,
/// in-arrival-order sequence of ticks. A stream that ends or stalls is
/// never resumed; the supervisor discards it and connects again.
pub trait TickSource: Send {
    fn connect(
        &mut self,
    ) -> impl std::future::Future<Output = FeedResult<mpsc::Receiver<Tick>>> + Send;
}

/// Deterministic source replaying a fixed price sequence.
///
/// Used by tests and file-replay runs. Every `connect` restarts the
/// sequence from the beginning, paced by `interval`.
#[derive(Debug, Clone)]
pub struct ReplayTickSource {
    prices: Vec<Price>,
    interval: Duration,
}

impl ReplayTickSource {
    pub fn new(prices: Vec<Price>, interval: Duration) -> Self {
        Self { prices, interval }
    }

    /// Parse one price per non-empty line.
    pub fn from_lines(content: &str, interval: Duration) -> FeedResult<Self> {
        let prices = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                line.parse::<Price>()
                    .map_err(|e| crate::error::FeedError::Connect(format!("bad price {line:?}: {e}")))
            })
            .collect::<FeedResult<Vec<_>>>()?;
        Ok(Self::new(prices, interval))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl TickSource for ReplayTickSource {
    async fn connect(&mut self) -> FeedResult<mpsc::Receiver<Tick>> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let prices = self.prices.clone();
        let interval = self.interval;

        debug!(count = prices.len(), "replay subscription opened");
        tokio::spawn(async move {
            for price in prices {
                if tx.send(Tick::new(price)).await.is_err() {
                    return;
                }
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
        });

        Ok(rx)
    }
}
