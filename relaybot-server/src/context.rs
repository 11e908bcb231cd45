//! relaybot-server/src/context.rs
//!
//! Builds the shared pieces the server runs on: stores, registry, event bus, dispatcher.

use std::fs;
use std::sync::Arc;

use tracing::info;

use relaybot_common::models::Platform;
use relaybot_core::config::{ChannelPrefixes, DispatcherConfig};
use relaybot_core::eventbus::EventBus;
use relaybot_core::repositories::{
    InMemoryCooldownStore, InMemoryUsageStore, InMemoryUserStore, StaticLocalizer,
};
use relaybot_core::services::builtin_commands::register_builtins;
use relaybot_core::services::{CommandRegistry, Dispatcher, ExecutionSerializer};
use relaybot_core::Error;

use crate::console::{ConsoleReplySender, CONSOLE_CHANNEL_ID};
use crate::Args;

pub struct ServerContext {
    pub config: DispatcherConfig,
    pub event_bus: EventBus,
    pub users: Arc<InMemoryUserStore>,
    pub cooldowns: Arc<InMemoryCooldownStore>,
    pub usages: Arc<InMemoryUsageStore>,
    pub serializer: Arc<ExecutionSerializer>,
    pub dispatcher: Arc<Dispatcher>,
}

impl ServerContext {
    pub fn new(args: &Args) -> Result<Self, Error> {
        let config = load_config(args)?;
        info!("Dispatcher config: {:?}", config);

        let registry = Arc::new(CommandRegistry::new(register_builtins));
        registry.ensure_built()?;

        let users = Arc::new(InMemoryUserStore::new());
        for dev in &args.developers {
            users.grant_developer(Platform::StreamChat, dev);
        }
        for moderator in &args.moderators {
            users.grant_channel_moderator(CONSOLE_CHANNEL_ID, moderator);
        }

        let cooldowns = Arc::new(InMemoryCooldownStore::new());
        let usages = Arc::new(InMemoryUsageStore::default());
        let serializer = Arc::new(ExecutionSerializer::new());
        let event_bus = EventBus::new();
        let prefixes = Arc::new(ChannelPrefixes::new(&args.prefix));

        let dispatcher = Dispatcher::builder(
            registry,
            users.clone(),
            cooldowns.clone(),
            Arc::new(StaticLocalizer::with_system_strings(&config.default_language)),
        )
        .config(config.clone())
        .prefixes(prefixes)
        .bot_identity(Platform::StreamChat, &args.bot_user_id)
        .sender(Arc::new(ConsoleReplySender::new()))
        .event_bus(event_bus.clone())
        .serializer(serializer.clone())
        .build();

        Ok(Self {
            config,
            event_bus,
            users,
            cooldowns,
            usages,
            serializer,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// File settings first, then any flags given on the command line.
fn load_config(args: &Args) -> Result<DispatcherConfig, Error> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str::<DispatcherConfig>(&raw)?
        }
        None => DispatcherConfig::default(),
    };

    if let Some(lang) = &args.default_language {
        config.default_language = lang.clone();
    }
    if let Some(secs) = args.handler_timeout_secs {
        config.handler_timeout_secs = secs;
    }
    if let Some(secs) = args.lock_idle_secs {
        config.lock_idle_secs = secs;
    }
    if let Some(secs) = args.lock_sweep_interval_secs {
        config.lock_sweep_interval_secs = secs;
    }
    if let Some(n) = args.max_in_flight {
        config.max_in_flight_events = n;
    }
    config.test_mode |= args.test_mode;
    Ok(config)
}
