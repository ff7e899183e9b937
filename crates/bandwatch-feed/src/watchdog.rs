//! Feed supervision: liveness watchdog and reconnect with backoff.
//!
//! The engine assumes a live, ordered tick stream. The supervisor sits
//! between the raw source and the engine's single consumer channel and
//! enforces that assumption: silence beyond the liveness bound means
//! the source is stalled and gets replaced rather than trusted, so a
//! stale price is never mistaken for a fresh one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{FeedError, FeedResult};
use crate::source::{Tick, TickSource};

/// Watchdog and reconnect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Maximum silence tolerated before the source counts as stalled (ms).
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
    /// Base delay for reconnect backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum reconnect backoff delay (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Maximum consecutive reconnect attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

fn default_liveness_timeout_ms() -> u64 {
    30_000
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: default_liveness_timeout_ms(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            max_reconnect_attempts: 0,
        }
    }
}

impl WatchdogConfig {
    fn liveness(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    /// Exponential backoff for the given attempt (1-based), capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self
            .reconnect_base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.reconnect_max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Why a subscription ended.
enum StreamEnd {
    Stalled,
    Disconnected,
    OutputClosed,
    Shutdown,
}

/// Supervises a `TickSource`, forwarding ticks into a bounded channel.
///
/// The forward channel has a single consumer, which preserves arrival
/// order end to end.
pub struct FeedSupervisor<S> {
    source: S,
    config: WatchdogConfig,
    out: mpsc::Sender<Tick>,
    shutdown: CancellationToken,
}

impl<S: TickSource> FeedSupervisor<S> {
    pub fn new(source: S, config: WatchdogConfig, out: mpsc::Sender<Tick>) -> Self {
        Self {
            source,
            config,
            out,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for requesting a graceful stop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until shutdown, the consumer goes away, or the reconnect
    /// budget is spent.
    pub async fn run(mut self) -> FeedResult<()> {
        let mut attempt: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            match self.source.connect().await {
                Ok(rx) => {
                    attempt = 0;
                    match self.pump(rx).await {
                        StreamEnd::Stalled => {
                            warn!(
                                liveness_ms = self.config.liveness_timeout_ms,
                                "tick source stalled, replacing subscription"
                            );
                        }
                        StreamEnd::Disconnected => {
                            warn!("tick source disconnected, replacing subscription");
                        }
                        StreamEnd::OutputClosed => {
                            info!("tick consumer gone, feed supervisor stopping");
                            return Ok(());
                        }
                        StreamEnd::Shutdown => return Ok(()),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "tick source connect failed");
                }
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                return Err(FeedError::ReconnectsExhausted(attempt));
            }

            let delay = self.config.backoff(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect backoff");
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Forward ticks from one subscription until it ends.
    async fn pump(&self, mut rx: mpsc::Receiver<Tick>) -> StreamEnd {
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => return StreamEnd::Shutdown,
                next = timeout(self.config.liveness(), rx.recv()) => next,
            };

            match next {
                Err(_) => return StreamEnd::Stalled,
                Ok(None) => return StreamEnd::Disconnected,
                Ok(Some(tick)) => {
                    if self.out.send(tick).await.is_err() {
                        return StreamEnd::OutputClosed;
                    }
                }
            }
        }
    }
}
