//! src/eventbus/mod.rs
//!
//! In-process event bus with guaranteed delivery to multiple subscribers
//! via bounded MPSC queues. The dispatcher publishes its audit trail here.

pub mod usage_logger;
pub mod usage_logger_handle;

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;
use relaybot_common::models::{CommandUsage, Platform};

/// Events that parts of the bot publish or subscribe to.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A request passed the gate and its handler is about to run.
    CommandExecuted(CommandUsage),

    /// A request finished, whatever the outcome.
    CommandCompleted {
        instance_id: Uuid,
        command: String,
        platform: Platform,
        user_id: String,
        elapsed_ms: u64,
        outcome: &'static str,
    },

    /// Periodic heartbeat.
    Tick,
}

impl BotEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::CommandExecuted(_) => "command.executed",
            BotEvent::CommandCompleted { .. } => "command.completed",
            BotEvent::Tick => "tick",
        }
    }

    pub fn platform(&self) -> Option<Platform> {
        match self {
            BotEvent::CommandExecuted(usage) => Some(usage.platform),
            BotEvent::CommandCompleted { platform, .. } => Some(*platform),
            _ => None,
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BotEvent>` for guaranteed delivery.
///
/// - If a subscriber's buffer fills, `publish` waits for space (backpressure).
/// - If a subscriber dropped its `Receiver`, sending to it fails and is skipped.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 10000;

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers. Closed subscribers are pruned.
    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
