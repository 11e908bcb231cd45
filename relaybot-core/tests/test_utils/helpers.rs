// File: relaybot-core/tests/test_utils/helpers.rs

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tracing::subscriber::DefaultGuard;

use relaybot_common::models::{
    CommandRequest, CommandResult, OutgoingReply, Platform, ReplyContext,
};
use relaybot_common::traits::{CooldownStore, Localizer, ReplySender, UserRoleStore};
use relaybot_core::Error;
use relaybot_core::config::DispatcherConfig;
use relaybot_core::eventbus::EventBus;
use relaybot_core::repositories::{InMemoryCooldownStore, InMemoryUserStore, StaticLocalizer};
use relaybot_core::services::{CommandContext, CommandRegistry, Dispatcher, RegistryBuilder};
use relaybot_core::utils::time::ManualClock;

/// Reply sender that keeps everything it was asked to send.
pub struct RecordingSender {
    platform: Platform,
    sent: Mutex<Vec<(ReplyContext, OutgoingReply)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self { platform, sent: Mutex::new(Vec::new()), fail: false })
    }

    /// Records, then reports a delivery failure.
    pub fn failing(platform: Platform) -> Arc<Self> {
        Arc::new(Self { platform, sent: Mutex::new(Vec::new()), fail: true })
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, r)| r.text.clone()).collect()
    }

    pub fn replies(&self) -> Vec<(ReplyContext, OutgoingReply)> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn send(&self, context: &ReplyContext, reply: &OutgoingReply) -> Result<(), Error> {
        self.sent.lock().push((context.clone(), reply.clone()));
        if self.fail {
            return Err(Error::Platform("connection reset".into()));
        }
        Ok(())
    }
}

/// Counts calls and answers with a fixed result.
pub fn counting_handler(
    calls: Arc<AtomicUsize>,
    reply: &'static str,
) -> impl Fn(&CommandContext) -> Result<Option<CommandResult>, Error> + Send + Sync + 'static {
    move |_ctx| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(CommandResult::text(reply)))
    }
}

/// Shared log sink for a capturing subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines_containing(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Installs a thread-local subscriber that writes plain text into the returned buffer.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// A dispatcher over in-memory collaborators with one recording sender per platform.
pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub users: Arc<InMemoryUserStore>,
    pub clock: ManualClock,
    pub stream: Arc<RecordingSender>,
    pub guild: Arc<RecordingSender>,
    pub direct: Arc<RecordingSender>,
    pub bus: EventBus,
}

impl Harness {
    pub fn new<F>(catalog: F) -> Self
    where
        F: Fn(&mut RegistryBuilder) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self::with_config(catalog, DispatcherConfig::default())
    }

    pub fn with_config<F>(catalog: F, config: DispatcherConfig) -> Self
    where
        F: Fn(&mut RegistryBuilder) -> Result<(), Error> + Send + Sync + 'static,
    {
        let users = Arc::new(InMemoryUserStore::new());
        Self::with_stores(catalog, config, users.clone(), users)
    }

    /// Uses `role_store` for lookups; `users` is kept for convenience setters.
    pub fn with_stores<F>(
        catalog: F,
        config: DispatcherConfig,
        users: Arc<InMemoryUserStore>,
        role_store: Arc<dyn UserRoleStore>,
    ) -> Self
    where
        F: Fn(&mut RegistryBuilder) -> Result<(), Error> + Send + Sync + 'static,
    {
        let clock = ManualClock::new(start_time());
        let cooldowns: Arc<dyn CooldownStore> =
            Arc::new(InMemoryCooldownStore::with_clock(Arc::new(clock.clone())));
        let localizer: Arc<dyn Localizer> = Arc::new(StaticLocalizer::default());
        let stream = RecordingSender::new(Platform::StreamChat);
        let guild = RecordingSender::new(Platform::Guild);
        let direct = RecordingSender::new(Platform::DirectMessaging);
        let bus = EventBus::new();

        let dispatcher = Dispatcher::builder(Arc::new(CommandRegistry::new(catalog)), role_store, cooldowns, localizer)
            .config(config)
            .bot_identity(Platform::StreamChat, "bot")
            .bot_identity(Platform::Guild, "bot")
            .bot_identity(Platform::DirectMessaging, "bot")
            .sender(stream.clone())
            .sender(guild.clone())
            .sender(direct.clone())
            .event_bus(bus.clone())
            .build();

        Self {
            dispatcher: Arc::new(dispatcher),
            users,
            clock,
            stream,
            guild,
            direct,
            bus,
        }
    }
}

pub fn stream_request(user_id: &str, command: &str, args: &[&str]) -> CommandRequest {
    CommandRequest::new(
        Platform::StreamChat,
        "100",
        user_id,
        user_id,
        command,
        args.iter().map(|s| s.to_string()).collect(),
        ReplyContext::StreamChat { channel_name: "somechannel".into(), reply_to: None },
    )
}

pub fn guild_request(user_id: &str, command: &str, args: &[&str]) -> CommandRequest {
    CommandRequest::new(
        Platform::Guild,
        "g-chan",
        user_id,
        user_id,
        command,
        args.iter().map(|s| s.to_string()).collect(),
        ReplyContext::GuildMessage {
            guild_id: Some("g".into()),
            channel_id: "g-chan".into(),
            message_id: "m".into(),
        },
    )
}
