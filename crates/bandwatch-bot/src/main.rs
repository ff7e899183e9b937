//! Bandwatch binary: replay-driven crossing engine.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use bandwatch_bot::{init_logging, AppConfig, CoreService, EventJournal};
use bandwatch_feed::{FeedSupervisor, ReplayTickSource};

#[derive(Debug, Parser)]
#[command(name = "bandwatch", about = "Price boundary-crossing engine")]
struct Args {
    /// Path to the TOML config file (default: $BANDWATCH_CONFIG or
    /// config/default.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.telemetry)?;
    info!(
        channels = config.engine.channel_pool_size,
        alarm_cap = config.engine.max_alarms_per_user,
        "bandwatch starting"
    );

    let replay_path = config
        .feed
        .replay_path
        .as_deref()
        .context("feed.replay_path is required for the standalone binary")?;
    let replay = std::fs::read_to_string(replay_path)
        .with_context(|| format!("failed to read replay file {replay_path}"))?;
    let source = ReplayTickSource::from_lines(
        &replay,
        Duration::from_millis(config.feed.replay_interval_ms),
    )?;
    info!(path = replay_path, ticks = source.len(), "replay source loaded");

    let journal = EventJournal::open(&config.persistence.journal_path).await?;

    let (tick_tx, tick_rx) = mpsc::channel(config.feed.tick_buffer);
    let (event_tx, mut event_rx) = mpsc::channel(config.engine.event_buffer);

    let supervisor = FeedSupervisor::new(source, config.feed.watchdog.clone(), tick_tx);
    let feed_token = supervisor.shutdown_token();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = supervisor.run().await {
            error!(error = %e, "feed supervisor failed");
        }
    });

    let (service, handle) = CoreService::new(&config.engine, tick_rx, event_tx);
    let core_token = service.shutdown_token();
    let core_task = tokio::spawn(async move {
        if let Err(e) = service.run().await {
            error!(error = %e, "core service failed");
        }
    });

    let dispatch_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!(kind = event.kind(), "event");
            if let Err(e) = journal.append(&event).await {
                warn!(error = %e, "journal append failed");
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    feed_token.cancel();
    core_token.cancel();
    let _ = feed_task.await;
    let _ = core_task.await;
    drop(handle);
    let _ = dispatch_task.await;

    info!("bandwatch stopped");
    Ok(())
}
