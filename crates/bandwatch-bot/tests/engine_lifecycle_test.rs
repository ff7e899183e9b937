//! End-to-end lifecycle tests for the core actor.

use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio::time::timeout;

use bandwatch_bot::config::EngineConfig;
use bandwatch_bot::{AppError, CoreHandle, CoreService};
use bandwatch_core::{EngineEvent, Price, UserId};
use bandwatch_feed::Tick;
use bandwatch_signal::{SignalDraft, SignalKind};

struct Harness {
    handle: CoreHandle,
    tick_tx: mpsc::Sender<Tick>,
    event_rx: mpsc::Receiver<EngineEvent>,
    core_token: tokio_util::sync::CancellationToken,
}

fn spawn_core(config: EngineConfig) -> Harness {
    let (tick_tx, tick_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (service, handle) = CoreService::new(&config, tick_rx, event_tx);
    let core_token = service.shutdown_token();
    tokio::spawn(service.run());
    Harness {
        handle,
        tick_tx,
        event_rx,
        core_token,
    }
}

async fn send_price(tx: &mpsc::Sender<Tick>, value: rust_decimal::Decimal) {
    tx.send(Tick::new(Price::new(value))).await.unwrap();
}

async fn next_event(rx: &mut mpsc::Receiver<EngineEvent>) -> EngineEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event within timeout")
        .expect("event channel open")
}

fn sell_draft(owner: i64) -> SignalDraft {
    SignalDraft {
        owner: UserId::new(owner),
        kind: SignalKind::Sell,
        entry_price: Price::new(dec!(2038)),
        min_price: Price::new(dec!(2034)),
        max_price: Price::new(dec!(2085)),
        created_price: Price::new(dec!(2040)),
        publishable: true,
    }
}

#[tokio::test]
async fn test_signal_lifecycle_through_tick_stream() {
    let mut h = spawn_core(EngineConfig::default());
    let id = h.handle.create_signal(sell_draft(1)).await.unwrap();

    // Seed, then cross the entry at 2038.
    send_price(&h.tick_tx, dec!(2040)).await;
    send_price(&h.tick_tx, dec!(2037)).await;

    match next_event(&mut h.event_rx).await {
        EngineEvent::SignalActivated {
            signal_id,
            assigned_channel,
        } => {
            assert_eq!(signal_id, id);
            assert!(assigned_channel.is_some());
        }
        other => panic!("expected activation, got {other:?}"),
    }

    // Gap through the stop at 2085.
    send_price(&h.tick_tx, dec!(2090)).await;

    match next_event(&mut h.event_rx).await {
        EngineEvent::SignalClosed {
            signal_id,
            closed_price,
            pip,
            ..
        } => {
            assert_eq!(signal_id, id);
            assert_eq!(closed_price, Price::new(dec!(2090)));
            assert_eq!(pip, dec!(-520));
        }
        other => panic!("expected close, got {other:?}"),
    }

    // Closure recomputed the owner's stats.
    let stats = h.handle.stats(UserId::new(1)).await.unwrap().unwrap();
    assert_eq!(stats.total_signals, 1);
    assert_eq!(stats.win_rate, dec!(0));

    h.core_token.cancel();
}

#[tokio::test]
async fn test_cancel_emits_event_and_blocks_activation() {
    let mut h = spawn_core(EngineConfig::default());
    let id = h.handle.create_signal(sell_draft(1)).await.unwrap();

    assert!(h.handle.cancel_signal(id).await.unwrap());
    assert!(matches!(
        next_event(&mut h.event_rx).await,
        EngineEvent::SignalCanceled { signal_id } if signal_id == id
    ));
    // Second cancel is a benign no-op.
    assert!(!h.handle.cancel_signal(id).await.unwrap());

    // Ticks crossing the entry produce nothing.
    send_price(&h.tick_tx, dec!(2040)).await;
    send_price(&h.tick_tx, dec!(2037)).await;
    send_price(&h.tick_tx, dec!(2038)).await;

    assert!(
        timeout(Duration::from_millis(200), h.event_rx.recv())
            .await
            .is_err(),
        "canceled signal must not activate"
    );

    h.core_token.cancel();
}

#[tokio::test]
async fn test_cancellation_events_survive_backpressure() {
    let (_tick_tx, tick_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::channel(1);
    let (service, handle) = CoreService::new(&EngineConfig::default(), tick_rx, event_tx);
    let token = service.shutdown_token();
    tokio::spawn(service.run());

    let a = handle.create_signal(sell_draft(1)).await.unwrap();
    let b = handle.create_signal(sell_draft(2)).await.unwrap();

    // Two cancellations against a one-slot event buffer: the second
    // waits for the consumer instead of being dropped.
    let canceler = tokio::spawn(async move {
        assert!(handle.cancel_signal(a).await.unwrap());
        assert!(handle.cancel_signal(b).await.unwrap());
    });

    for expected in [a, b] {
        match next_event(&mut event_rx).await {
            EngineEvent::SignalCanceled { signal_id } => assert_eq!(signal_id, expected),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
    canceler.await.unwrap();

    token.cancel();
}

#[tokio::test]
async fn test_alarm_fires_once_through_tick_stream() {
    let mut h = spawn_core(EngineConfig::default());
    let user = UserId::new(7);
    h.handle
        .register_alarm(user, Price::new(dec!(2450)))
        .await
        .unwrap();

    send_price(&h.tick_tx, dec!(2440)).await;
    send_price(&h.tick_tx, dec!(2455)).await;

    match next_event(&mut h.event_rx).await {
        EngineEvent::AlarmFired {
            user_id,
            target_price,
        } => {
            assert_eq!(user_id, user);
            assert_eq!(target_price, Price::new(dec!(2450)));
        }
        other => panic!("expected alarm, got {other:?}"),
    }

    // Recrossing without rearming stays silent.
    send_price(&h.tick_tx, dec!(2440)).await;
    assert!(
        timeout(Duration::from_millis(200), h.event_rx.recv())
            .await
            .is_err(),
        "consumed alarm must not refire"
    );

    h.core_token.cancel();
}

#[tokio::test]
async fn test_alarm_cap_is_enforced_per_user() {
    let h = spawn_core(EngineConfig {
        max_alarms_per_user: 2,
        ..EngineConfig::default()
    });
    let user = UserId::new(1);

    h.handle
        .register_alarm(user, Price::new(dec!(2450)))
        .await
        .unwrap();
    h.handle
        .register_alarm(user, Price::new(dec!(2460)))
        .await
        .unwrap();

    // Duplicate of an armed pair does not consume a slot.
    h.handle
        .register_alarm(user, Price::new(dec!(2450)))
        .await
        .unwrap();

    let err = h
        .handle
        .register_alarm(user, Price::new(dec!(2470)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlarmLimit { limit: 2, .. }));

    // Another user is unaffected.
    h.handle
        .register_alarm(UserId::new(2), Price::new(dec!(2470)))
        .await
        .unwrap();

    // Freeing a slot admits a new registration.
    assert!(h
        .handle
        .cancel_alarm(user, Price::new(dec!(2460)))
        .await
        .unwrap());
    h.handle
        .register_alarm(user, Price::new(dec!(2470)))
        .await
        .unwrap();

    h.core_token.cancel();
}

#[tokio::test]
async fn test_risk_free_breakeven_close() {
    let mut h = spawn_core(EngineConfig::default());
    let id = h
        .handle
        .create_signal(SignalDraft {
            owner: UserId::new(1),
            kind: SignalKind::Buy,
            entry_price: Price::new(dec!(2000)),
            min_price: Price::new(dec!(1980)),
            max_price: Price::new(dec!(2050)),
            created_price: Price::new(dec!(1995)),
            publishable: false,
        })
        .await
        .unwrap();

    send_price(&h.tick_tx, dec!(2001)).await;
    send_price(&h.tick_tx, dec!(1999)).await;
    assert!(matches!(
        next_event(&mut h.event_rx).await,
        EngineEvent::SignalActivated {
            assigned_channel: None,
            ..
        }
    ));

    assert!(h.handle.set_risk_free(id).await.unwrap());

    // Dip, then recover through the entry: break-even close.
    send_price(&h.tick_tx, dec!(1990)).await;
    send_price(&h.tick_tx, dec!(2000)).await;

    match next_event(&mut h.event_rx).await {
        EngineEvent::SignalClosed { pip, score, .. } => {
            assert_eq!(pip, dec!(0));
            assert_eq!(score, dec!(0));
        }
        other => panic!("expected close, got {other:?}"),
    }

    // Terminal signal can be archived, which empties the stats set.
    assert!(h.handle.archive_signal(id).await.unwrap());
    let stats = h.handle.stats(UserId::new(1)).await.unwrap().unwrap();
    assert_eq!(stats.total_signals, 1);

    h.core_token.cancel();
}
