//! src/eventbus/usage_logger.rs
//!
//! Subscribes to the EventBus, buffers `BotEvent::CommandExecuted` usages and
//! flushes them to a `UsageStore`. Drains the queue on shutdown, then does a final flush.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{error, info};

use relaybot_common::models::CommandUsage;
use relaybot_common::traits::UsageStore;
use crate::Error;
use crate::eventbus::{BotEvent, EventBus};
use crate::eventbus::usage_logger_handle::{UsageLoggerCommand, UsageLoggerControl};

/// Spawns the usage logger. The returned handle resolves after the final flush;
/// the control forces flushes on demand.
pub async fn spawn_usage_logger_task(
    event_bus: &EventBus,
    store: Arc<dyn UsageStore>,
    batch_size: usize,
    flush_interval: Duration,
) -> (JoinHandle<()>, UsageLoggerControl) {
    let batch_size = batch_size.max(1);
    let mut rx = event_bus.subscribe(Some(batch_size * 4)).await;
    let mut shutdown_rx = event_bus.shutdown_rx.clone();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<UsageLoggerCommand>(8);

    let handle = tokio::spawn(async move {
        let mut buffer: Vec<CommandUsage> = Vec::with_capacity(batch_size);
        let mut last_flush = Instant::now();

        info!(
            "Usage logger task started with batch_size={} flush_interval={:?}",
            batch_size, flush_interval
        );

        loop {
            tokio::select! {
                biased;
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let BotEvent::CommandExecuted(usage) = event {
                                buffer.push(usage);
                            }
                            if buffer.len() >= batch_size {
                                if let Err(e) = flush(store.as_ref(), &mut buffer).await {
                                    error!("Error writing usage batch: {:?}", e);
                                }
                                last_flush = Instant::now();
                            }
                        }
                        None => {
                            info!("Usage logger channel closed => break from loop.");
                            break;
                        }
                    }
                },
                Some(cmd) = cmd_rx.recv() => {
                    match cmd {
                        UsageLoggerCommand::FlushNow(reply) => {
                            // Pick up anything already queued so callers see their own events.
                            while let Ok(event) = rx.try_recv() {
                                if let BotEvent::CommandExecuted(usage) = event {
                                    buffer.push(usage);
                                }
                            }
                            let res = flush(store.as_ref(), &mut buffer).await;
                            last_flush = Instant::now();
                            let _ = reply.send(res);
                        }
                    }
                },
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Usage logger shutting down => break from loop.");
                        break;
                    }
                },
                _ = sleep(flush_interval) => {
                    if !buffer.is_empty() && last_flush.elapsed() >= flush_interval {
                        if let Err(e) = flush(store.as_ref(), &mut buffer).await {
                            error!("Periodic usage flush error: {:?}", e);
                        }
                        last_flush = Instant::now();
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            if let BotEvent::CommandExecuted(usage) = event {
                buffer.push(usage);
            }
        }

        if !buffer.is_empty() {
            info!("Usage logger final flush: {} usages remain.", buffer.len());
            if let Err(e) = flush(store.as_ref(), &mut buffer).await {
                error!("Final usage flush error: {:?}", e);
            }
        }

        info!("Usage logger task exited.");
    });

    (handle, UsageLoggerControl::new(cmd_tx))
}

async fn flush(store: &dyn UsageStore, buffer: &mut Vec<CommandUsage>) -> Result<(), Error> {
    if buffer.is_empty() {
        return Ok(());
    }
    store.record_usages(buffer).await?;
    buffer.clear();
    Ok(())
}
