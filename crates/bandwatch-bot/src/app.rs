//! Single-writer core actor.
//!
//! All mutation of signal and alarm state funnels through one task:
//! ticks and commands arrive on channels and are interleaved in one
//! `select!` loop, so the engine never needs internal locking and the
//! previous/current threading of the price stream stays sound. Callers
//! hold a cheap [`CoreHandle`] and get replies over oneshots.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bandwatch_alarm::AlarmStore;
use bandwatch_core::{EngineEvent, Price, PriceObservation, SignalId, UserId};
use bandwatch_feed::Tick;
use bandwatch_signal::{SignalDraft, SignalEngine, SignalError};
use bandwatch_stats::{StatsAggregator, UserStats};

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};

/// Command channel capacity.
const COMMAND_BUFFER: usize = 64;

enum CoreMsg {
    CreateSignal {
        draft: SignalDraft,
        respond: oneshot::Sender<AppResult<SignalId>>,
    },
    CancelSignal {
        id: SignalId,
        respond: oneshot::Sender<bool>,
    },
    SetRiskFree {
        id: SignalId,
        respond: oneshot::Sender<bool>,
    },
    ArchiveSignal {
        id: SignalId,
        respond: oneshot::Sender<bool>,
    },
    RegisterAlarm {
        user: UserId,
        target: Price,
        respond: oneshot::Sender<AppResult<()>>,
    },
    CancelAlarm {
        user: UserId,
        target: Price,
        respond: oneshot::Sender<bool>,
    },
    GetStats {
        user: UserId,
        respond: oneshot::Sender<Option<UserStats>>,
    },
}

/// Cloneable command surface of the core actor.
#[derive(Clone)]
pub struct CoreHandle {
    tx: mpsc::Sender<CoreMsg>,
}

impl CoreHandle {
    async fn request<T>(
        &self,
        msg: CoreMsg,
        rx: oneshot::Receiver<T>,
    ) -> AppResult<T> {
        self.tx.send(msg).await.map_err(|_| AppError::EngineGone)?;
        rx.await.map_err(|_| AppError::EngineGone)
    }

    /// Register a new Pending signal.
    pub async fn create_signal(&self, draft: SignalDraft) -> AppResult<SignalId> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::CreateSignal { draft, respond }, rx)
            .await?
    }

    /// Cancel a Pending signal; `false` when it already left Pending.
    pub async fn cancel_signal(&self, id: SignalId) -> AppResult<bool> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::CancelSignal { id, respond }, rx).await
    }

    /// Mark a live signal risk-free.
    pub async fn set_risk_free(&self, id: SignalId) -> AppResult<bool> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::SetRiskFree { id, respond }, rx).await
    }

    /// Soft-delete a terminal signal.
    pub async fn archive_signal(&self, id: SignalId) -> AppResult<bool> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::ArchiveSignal { id, respond }, rx).await
    }

    /// Arm a one-shot price alarm, subject to the per-user cap.
    pub async fn register_alarm(&self, user: UserId, target: Price) -> AppResult<()> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::RegisterAlarm { user, target, respond }, rx)
            .await?
    }

    /// Disarm an alarm; `false` when nothing was armed.
    pub async fn cancel_alarm(&self, user: UserId, target: Price) -> AppResult<bool> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::CancelAlarm { user, target, respond }, rx)
            .await
    }

    /// Latest recomputed stats for `user`.
    pub async fn stats(&self, user: UserId) -> AppResult<Option<UserStats>> {
        let (respond, rx) = oneshot::channel();
        self.request(CoreMsg::GetStats { user, respond }, rx).await
    }
}

/// The core actor: sole owner and writer of engine and alarm state.
pub struct CoreService {
    engine: SignalEngine,
    alarms: AlarmStore,
    stats: StatsAggregator,
    max_alarms_per_user: usize,
    previous: Option<Price>,
    commands: mpsc::Receiver<CoreMsg>,
    ticks: mpsc::Receiver<Tick>,
    events: mpsc::Sender<EngineEvent>,
    shutdown: CancellationToken,
}

impl CoreService {
    /// Build the actor and its handle.
    pub fn new(
        config: &EngineConfig,
        ticks: mpsc::Receiver<Tick>,
        events: mpsc::Sender<EngineEvent>,
    ) -> (Self, CoreHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let service = Self {
            engine: SignalEngine::new(config.channel_pool_size),
            alarms: AlarmStore::new(),
            stats: StatsAggregator::new(),
            max_alarms_per_user: config.max_alarms_per_user,
            previous: None,
            commands,
            ticks,
            events,
            shutdown: CancellationToken::new(),
        };
        (service, CoreHandle { tx })
    }

    /// Token for requesting a graceful stop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until shutdown or the tick stream closes.
    ///
    /// Returns an error only on a state invariant violation, which is
    /// not recoverable by retrying ticks.
    pub async fn run(mut self) -> AppResult<()> {
        info!("core service started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("core service stopping");
                    return Ok(());
                }
                tick = self.ticks.recv() => {
                    match tick {
                        Some(tick) => self.on_tick(tick).await?,
                        None => {
                            info!("tick stream closed, core service stopping");
                            return Ok(());
                        }
                    }
                }
                msg = self.commands.recv() => {
                    match msg {
                        Some(msg) => self.on_command(msg).await,
                        None => {
                            info!("all handles dropped, core service stopping");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn on_tick(&mut self, tick: Tick) -> AppResult<()> {
        let Some(previous) = self.previous.replace(tick.price) else {
            // First tick only seeds the previous price.
            debug!(price = %tick.price, "price stream seeded");
            return Ok(());
        };

        let observation = PriceObservation::new(previous, tick.price);

        // Events accumulated before a violation still go out; the error
        // is surfaced only after they are delivered.
        let mut events = Vec::new();
        let result = self.engine.on_tick(&observation, &mut events);

        for event in events {
            if let EngineEvent::SignalClosed { signal_id, .. } = &event {
                self.recompute_owner_stats(*signal_id)?;
            }
            self.emit(event).await;
        }

        if let Err(e) = result {
            error!(error = %e, "tick evaluation failed, state is suspect");
            return Err(e.into());
        }

        for fired in self.alarms.consume_crossed(&observation) {
            self.emit(EngineEvent::AlarmFired {
                user_id: fired.user_id,
                target_price: fired.target_price,
            })
            .await;
        }

        Ok(())
    }

    fn recompute_owner_stats(&self, signal_id: SignalId) -> AppResult<()> {
        let owner = self
            .engine
            .get(signal_id)
            .map(|s| s.owner)
            .ok_or_else(|| {
                SignalError::InvariantViolation(format!(
                    "closed signal {signal_id} missing from engine"
                ))
            })?;
        let outcomes = self.engine.closed_outcomes_for(owner)?;
        self.stats.recompute(owner, &outcomes);
        Ok(())
    }

    async fn emit(&self, event: EngineEvent) {
        if self.events.send(event).await.is_err() {
            warn!("event consumer gone, dropping events");
        }
    }

    async fn on_command(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::CreateSignal { draft, respond } => {
                let result = self.engine.create(draft).map_err(AppError::from);
                let _ = respond.send(result);
            }
            CoreMsg::CancelSignal { id, respond } => {
                let event = self.engine.cancel(id);
                let canceled = event.is_some();
                if let Some(event) = event {
                    // Cancellation is command-driven, not tick-driven,
                    // but it gets the same delivery guarantee as the
                    // tick path.
                    self.emit(event).await;
                }
                let _ = respond.send(canceled);
            }
            CoreMsg::SetRiskFree { id, respond } => {
                let _ = respond.send(self.engine.set_risk_free(id));
            }
            CoreMsg::ArchiveSignal { id, respond } => {
                let _ = respond.send(self.engine.archive(id));
            }
            CoreMsg::RegisterAlarm { user, target, respond } => {
                let _ = respond.send(self.register_alarm(user, target));
            }
            CoreMsg::CancelAlarm { user, target, respond } => {
                let _ = respond.send(self.alarms.cancel(user, target));
            }
            CoreMsg::GetStats { user, respond } => {
                let _ = respond.send(self.stats.get(user));
            }
        }
    }

    fn register_alarm(&self, user: UserId, target: Price) -> AppResult<()> {
        // A re-registration of an already armed pair never counts
        // against the cap.
        if !self.alarms.is_armed(user, target)
            && self.alarms.armed_for(user) >= self.max_alarms_per_user
        {
            return Err(AppError::AlarmLimit {
                user,
                limit: self.max_alarms_per_user,
            });
        }
        self.alarms.register(user, target)?;
        Ok(())
    }
}
