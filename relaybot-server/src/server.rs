//! relaybot-server/src/server.rs
//!
//! Main server loop: background tasks, the console listener, shutdown.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use relaybot_core::eventbus::usage_logger::spawn_usage_logger_task;
use relaybot_core::eventbus::usage_logger_handle::UsageLoggerControl;
use relaybot_core::eventbus::BotEvent;
use relaybot_core::services::{DispatchOutcome, PlatformEvent};
use relaybot_core::tasks::spawn_lock_sweep_task;
use relaybot_core::Error;

use crate::console::{describe_event, line_to_message};
use crate::context::ServerContext;
use crate::Args;

const USAGE_BATCH_SIZE: usize = 50;
const USAGE_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const TICK_INTERVAL: Duration = Duration::from_secs(60);
/// Extra time in-flight commands get on shutdown beyond the handler timeout.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

type InFlight = JoinSet<Option<DispatchOutcome>>;

pub async fn run_server(args: Args) -> Result<(), Error> {
    let ctx = ServerContext::new(&args)?;

    // 1) Usage logger
    let (usage_handle, usage_control) = spawn_usage_logger_task(
        &ctx.event_bus,
        ctx.usages.clone(),
        USAGE_BATCH_SIZE,
        USAGE_FLUSH_INTERVAL,
    )
    .await;

    // 2) Outcome log
    let mut outcomes = ctx.event_bus.subscribe(None).await;
    let outcome_task = tokio::spawn(async move {
        while let Some(event) = outcomes.recv().await {
            if let Some(line) = describe_event(&event) {
                debug!("{}", line);
            }
        }
    });

    // 3) Lock sweeper
    let sweeper = spawn_lock_sweep_task(
        ctx.serializer.clone(),
        Some(ctx.cooldowns.clone()),
        ctx.config.lock_sweep_interval(),
        ctx.config.lock_idle(),
    );

    info!("Type chat lines (e.g. '!ping', '@alice !whoami'). Ctrl-C or EOF to quit.");

    // 4) Main loop: stdin lines become stream-chat events.
    let mut in_flight = InFlight::new();
    serve_console(&ctx, tokio::io::stdin(), &args.channel, &args.user, &mut in_flight).await;

    // 5) Let queued commands finish, flush, stop background tasks
    let grace = ctx.config.handler_timeout().unwrap_or(TICK_INTERVAL) + DRAIN_GRACE;
    finish_session(&ctx, in_flight, grace, usage_control, usage_handle).await;
    sweeper.abort();
    outcome_task.abort();

    Ok(())
}

/// Reads chat lines until EOF, Ctrl-C or bus shutdown, queueing each as a stream-chat event.
async fn serve_console<R>(ctx: &ServerContext, input: R, channel: &str, user: &str, in_flight: &mut InFlight)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut shutdown_rx = ctx.event_bus.shutdown_rx.clone();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut tick = time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let Some(msg) = line_to_message(&line, channel, user) else { continue };
                        queue_event(ctx, in_flight, PlatformEvent::StreamChat(msg)).await;
                    }
                    Ok(None) => {
                        info!("stdin closed; shutting down.");
                        break;
                    }
                    Err(e) => {
                        error!("stdin read error: {:?}", e);
                        break;
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!("Console event task failed: {:?}", e);
                }
            }
            _ = tick.tick() => {
                ctx.event_bus.publish(BotEvent::Tick).await;
                debug!("{} user locks live, {} events in flight", ctx.serializer.len(), in_flight.len());
            }
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl-C: {:?}", e);
                }
                info!("Ctrl-C detected; shutting down.");
                break;
            }
            Ok(_) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Shutdown signaled; exiting server loop.");
                    break;
                }
            }
        }
    }
}

async fn queue_event(ctx: &ServerContext, in_flight: &mut InFlight, event: PlatformEvent) {
    match ctx.dispatcher.spawn_event(event).await {
        Ok(handle) => {
            in_flight.spawn(async move { handle.await.ok().flatten() });
        }
        Err(e) => warn!("Could not queue console event: {:?}", e),
    }
}

/// Waits for in-flight events, aborting whatever is left after `grace`. Returns how many finished.
async fn drain_in_flight(in_flight: &mut InFlight, grace: Duration) -> usize {
    if in_flight.is_empty() {
        return 0;
    }
    info!("Waiting for {} in-flight command(s)...", in_flight.len());
    let mut finished = 0;
    let drained = time::timeout(grace, async {
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(_) => finished += 1,
                Err(e) => warn!("Console event task failed: {:?}", e),
            }
        }
    })
    .await;
    if drained.is_err() {
        warn!("{} command(s) still running after {:?}; abandoning them.", in_flight.len(), grace);
        in_flight.abort_all();
    }
    finished
}

async fn finish_session(
    ctx: &ServerContext,
    mut in_flight: InFlight,
    grace: Duration,
    usage_control: UsageLoggerControl,
    usage_handle: JoinHandle<()>,
) {
    drain_in_flight(&mut in_flight, grace).await;
    if let Err(e) = usage_control.flush_now().await {
        error!("Final usage flush failed: {:?}", e);
    }
    ctx.event_bus.shutdown();
    if let Err(e) = usage_handle.await {
        error!("Usage logger task failed: {:?}", e);
    }
    info!("{} command usages recorded this session.", ctx.usages.len());
}
