// File: relaybot-core/src/services/dispatcher.rs
//
// The command engine: normalize, resolve, gate, serialize, run, reply.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use relaybot_common::models::{
    CommandDescriptor, CommandRequest, CommandResult, CommandUsage, OutgoingReply, Platform, RequiredRole,
    UserAuthorization,
};
use relaybot_common::traits::{CooldownStore, Localizer, ReplySender, UserRoleStore};

use crate::config::{ChannelPrefixes, DispatcherConfig};
use crate::eventbus::{BotEvent, EventBus};
use crate::services::command_handler::{CommandContext, CommandExecutor};
use crate::services::command_registry::{CommandRegistry, RegisteredCommand};
use crate::services::gate::{self, DenyReason, GateDecision};
use crate::services::normalizers::{
    DirectMessage, DirectNormalizer, GuildEvent, GuildNormalizer, IgnoreReason, Normalized,
    Normalizer, StreamChatMessage, StreamChatNormalizer,
};
use crate::services::serializer::ExecutionSerializer;
use crate::services::system_strings;
use crate::Error;

/// A raw event from one of the platform listeners.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    StreamChat(StreamChatMessage),
    Guild(GuildEvent),
    Direct(DirectMessage),
}

/// How a single event or request ended. Only the two fault variants carry an error.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not a command at all (no prefix, bare prefix, own echo).
    Ignored(IgnoreReason),
    /// No command under that name or alias.
    NotFound,
    /// Banned or ignored user. Nothing was sent.
    Suppressed,
    /// Unsupported platform, missing role or running cooldown.
    Denied(DenyReason),
    /// The command is in maintenance; the placeholder message was sent instead.
    Maintenance,
    /// The handler ran. `replied` is false for empty messages and failed sends.
    Executed { replied: bool },
    /// The handler returned no result at all.
    MissingResult,
    HandlerFault(Error),
    InfrastructureFault(Error),
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Ignored(_) => "ignored",
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::Suppressed => "suppressed",
            DispatchOutcome::Denied(DenyReason::RateLimited) => "rate_limited",
            DispatchOutcome::Denied(_) => "denied",
            DispatchOutcome::Maintenance => "maintenance",
            DispatchOutcome::Executed { .. } => "executed",
            DispatchOutcome::MissingResult => "missing_result",
            DispatchOutcome::HandlerFault(_) => "handler_fault",
            DispatchOutcome::InfrastructureFault(_) => "infrastructure_fault",
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::HandlerFault(_) | DispatchOutcome::InfrastructureFault(_)
        )
    }
}

pub struct DispatcherBuilder {
    registry: Arc<CommandRegistry>,
    users: Arc<dyn UserRoleStore>,
    cooldowns: Arc<dyn CooldownStore>,
    localizer: Arc<dyn Localizer>,
    config: DispatcherConfig,
    prefixes: Arc<ChannelPrefixes>,
    bot_ids: HashMap<Platform, String>,
    senders: HashMap<Platform, Arc<dyn ReplySender>>,
    event_bus: Option<EventBus>,
    serializer: Option<Arc<ExecutionSerializer>>,
}

impl DispatcherBuilder {
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn prefixes(mut self, prefixes: Arc<ChannelPrefixes>) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// The bot's own account on `platform`, used to drop its echoed messages.
    pub fn bot_identity(mut self, platform: Platform, user_id: &str) -> Self {
        self.bot_ids.insert(platform, user_id.to_string());
        self
    }

    /// Registers the sender for the platform it reports.
    pub fn sender(mut self, sender: Arc<dyn ReplySender>) -> Self {
        self.senders.insert(sender.platform(), sender);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Share a lock map, e.g. with the sweeper task.
    pub fn serializer(mut self, serializer: Arc<ExecutionSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn build(self) -> Dispatcher {
        let bot_id = |p: Platform| self.bot_ids.get(&p).cloned().unwrap_or_default();
        let stream_chat = StreamChatNormalizer::new(&bot_id(Platform::StreamChat), self.prefixes.clone());
        let guild = GuildNormalizer::new(&bot_id(Platform::Guild), self.prefixes.clone());
        let direct = DirectNormalizer::new(&bot_id(Platform::DirectMessaging), self.prefixes.clone());
        let workers = Arc::new(Semaphore::new(self.config.max_in_flight_events.max(1)));

        Dispatcher {
            registry: self.registry,
            users: self.users,
            cooldowns: self.cooldowns,
            localizer: self.localizer,
            serializer: self.serializer.unwrap_or_default(),
            senders: self.senders,
            event_bus: self.event_bus,
            config: self.config,
            stream_chat,
            guild,
            direct,
            workers,
        }
    }
}

/// Shared by `Arc` between all platform listeners.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    users: Arc<dyn UserRoleStore>,
    cooldowns: Arc<dyn CooldownStore>,
    localizer: Arc<dyn Localizer>,
    serializer: Arc<ExecutionSerializer>,
    senders: HashMap<Platform, Arc<dyn ReplySender>>,
    event_bus: Option<EventBus>,
    config: DispatcherConfig,
    stream_chat: StreamChatNormalizer,
    guild: GuildNormalizer,
    direct: DirectNormalizer,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn builder(
        registry: Arc<CommandRegistry>,
        users: Arc<dyn UserRoleStore>,
        cooldowns: Arc<dyn CooldownStore>,
        localizer: Arc<dyn Localizer>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            users,
            cooldowns,
            localizer,
            config: DispatcherConfig::default(),
            prefixes: Arc::new(ChannelPrefixes::default()),
            bot_ids: HashMap::new(),
            senders: HashMap::new(),
            event_bus: None,
            serializer: None,
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn serializer(&self) -> &Arc<ExecutionSerializer> {
        &self.serializer
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs an event on a worker task once a slot in the in-flight pool frees up.
    ///
    /// The handle yields `None` if processing panicked; the panic is logged here.
    pub async fn spawn_event(self: &Arc<Self>, event: PlatformEvent) -> Result<JoinHandle<Option<DispatchOutcome>>, Error> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::EventBus("dispatcher worker pool is closed".into()))?;

        let me = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _permit = permit;
            match AssertUnwindSafe(me.handle_event(event)).catch_unwind().await {
                Ok(outcome) => Some(outcome),
                Err(panic) => {
                    error!("Dispatcher task panicked: {}", panic_message(panic.as_ref()));
                    None
                }
            }
        }))
    }

    /// Normalizes a raw event and dispatches it if it is a command.
    pub async fn handle_event(&self, event: PlatformEvent) -> DispatchOutcome {
        let normalized = match &event {
            PlatformEvent::StreamChat(msg) => self.stream_chat.normalize(msg),
            PlatformEvent::Guild(evt) => self.guild.normalize(evt),
            PlatformEvent::Direct(msg) => self.direct.normalize(msg),
        };
        match normalized {
            Normalized::Command(request) => self.dispatch(request).await,
            Normalized::Ignored(reason) => {
                trace!("event ignored: {:?}", reason);
                DispatchOutcome::Ignored(reason)
            }
        }
    }

    /// Processes one canonical request to completion.
    pub async fn dispatch(&self, request: CommandRequest) -> DispatchOutcome {
        let started = Instant::now();
        let request = Arc::new(request);

        let outcome = self.process(&request).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            instance_id = %request.instance_id,
            platform = %request.platform,
            user_id = %request.user_id,
            "command '{}' completed in {} ms ({})",
            request.raw_command_name,
            elapsed_ms,
            outcome.label()
        );

        if let Some(bus) = &self.event_bus {
            bus.publish(BotEvent::CommandCompleted {
                instance_id: request.instance_id,
                command: request.raw_command_name.clone(),
                platform: request.platform,
                user_id: request.user_id.clone(),
                elapsed_ms,
                outcome: outcome.label(),
            })
            .await;
        }

        outcome
    }

    async fn process(&self, request: &Arc<CommandRequest>) -> DispatchOutcome {
        let command = match self.registry.resolve(&request.raw_command_name) {
            Ok(Some(command)) => command,
            Ok(None) => {
                warn!(
                    instance_id = %request.instance_id,
                    "Unknown command '{}' from user {} on {}",
                    request.raw_command_name, request.user_id, request.platform
                );
                return DispatchOutcome::NotFound;
            }
            Err(e) => return self.infrastructure_fault(request, e).await,
        };

        let auth = match self.resolve_authorization(request, command.descriptor.required_role).await {
            Ok(auth) => auth,
            Err(e) => return self.infrastructure_fault(request, e).await,
        };

        match gate::check_access(&command.descriptor, request, &auth) {
            GateDecision::Allow => {}
            GateDecision::Maintenance => {
                info!(
                    instance_id = %request.instance_id,
                    "'{}' is under maintenance, sending placeholder",
                    command.descriptor.name
                );
                let text = self.system_text(request, auth.language.as_str(), system_strings::UNDER_MAINTENANCE, &[]);
                self.send_reply(request, OutgoingReply::system(text)).await;
                return DispatchOutcome::Maintenance;
            }
            GateDecision::Deny(reason) => return self.deny(request, &command.descriptor, &auth, reason).await,
        }

        self.serializer
            .with_user_lock(&request.user_id, self.run_gated(request, &command, auth))
            .await
    }

    /// Cooldown consume and handler run, under the user's lock.
    async fn run_gated(
        &self,
        request: &Arc<CommandRequest>,
        command: &RegisteredCommand,
        auth: UserAuthorization,
    ) -> DispatchOutcome {
        let descriptor = &command.descriptor;
        match gate::evaluate(descriptor, request, &auth, self.cooldowns.as_ref()).await {
            Ok(GateDecision::Allow) => {}
            Ok(GateDecision::Deny(reason)) => return self.deny(request, descriptor, &auth, reason).await,
            Ok(GateDecision::Maintenance) => return DispatchOutcome::Maintenance,
            Err(e) => return self.infrastructure_fault(request, e).await,
        }

        if !self.config.test_mode {
            self.publish_usage(request, &descriptor.name).await;
        }

        let language = auth.language.clone();
        let ctx = CommandContext {
            request: Arc::clone(request),
            descriptor: Arc::clone(descriptor),
            authorization: auth,
        };

        let HandlerRun { result, straggler } =
            run_handler(&command.executor, ctx, self.config.handler_timeout()).await;

        let outcome = match result {
            Ok(Some(result)) if result.is_error => {
                let cause = result.error.clone().unwrap_or_else(|| result.message.clone());
                let err = command_failed(request, &descriptor.name, cause);
                error!(instance_id = %request.instance_id, "{}", err);
                self.send_generic_error(request, &language).await;
                DispatchOutcome::HandlerFault(err)
            }
            Ok(Some(result)) => self.deliver(request, result).await,
            Ok(None) => {
                warn!(
                    instance_id = %request.instance_id,
                    "Command '{}' returned no result (args: '{}')",
                    descriptor.name, request.arguments_joined
                );
                DispatchOutcome::MissingResult
            }
            Err(e) => {
                let err = command_failed(request, &descriptor.name, e.to_string());
                error!(instance_id = %request.instance_id, "{}", err);
                self.send_generic_error(request, &language).await;
                DispatchOutcome::HandlerFault(err)
            }
        };

        // A blocking thread cannot be cancelled; the user's lock is held until it returns.
        if let Some(thread) = straggler {
            warn!(
                instance_id = %request.instance_id,
                "Command '{}' timed out; holding lock for user {} until its thread finishes",
                descriptor.name, request.user_id
            );
            if let Err(e) = thread.await {
                debug!(instance_id = %request.instance_id, "timed-out handler thread ended abnormally: {}", e);
            }
        }
        outcome
    }

    async fn resolve_authorization(
        &self,
        request: &CommandRequest,
        required: RequiredRole,
    ) -> Result<UserAuthorization, Error> {
        let mut auth = self
            .users
            .get_authorization(request.platform, &request.user_id)
            .await?;
        if auth.language.is_empty() {
            auth.language = self.config.default_language.clone();
        }

        // Channel moderation only exists on the stream platform, and only matters
        // when nothing stronger already covers the requirement.
        if request.platform == Platform::StreamChat
            && required == RequiredRole::ChannelModerator
            && !auth.is_suppressed()
            && !auth.satisfies(required)
        {
            auth.is_channel_moderator = self
                .users
                .is_channel_moderator(request.platform, &request.channel_id, &request.user_id)
                .await?;
        }
        Ok(auth)
    }

    async fn deny(
        &self,
        request: &CommandRequest,
        descriptor: &CommandDescriptor,
        auth: &UserAuthorization,
        reason: DenyReason,
    ) -> DispatchOutcome {
        let command_name = descriptor.name.as_str();
        match reason {
            DenyReason::Suppressed => {
                info!(
                    instance_id = %request.instance_id,
                    "Ignoring '{}' from suppressed user {}",
                    command_name, request.user_id
                );
                return DispatchOutcome::Suppressed;
            }
            DenyReason::Unsupported => {
                debug!(
                    instance_id = %request.instance_id,
                    "'{}' is not available on {}",
                    command_name, request.platform
                );
            }
            DenyReason::InsufficientRole => {
                info!(
                    instance_id = %request.instance_id,
                    "User {} lacks the role for '{}'",
                    request.user_id, command_name
                );
                let text = self.system_text(request, &auth.language, system_strings::INSUFFICIENT_RIGHTS, &[]);
                self.send_reply(request, OutgoingReply::system(text)).await;
            }
            DenyReason::RateLimited => {
                if descriptor.notify_on_cooldown {
                    let subs = [("command".to_string(), command_name.to_string())];
                    let text = self.system_text(request, &auth.language, system_strings::COOLDOWN_NOTICE, &subs);
                    self.send_reply(request, OutgoingReply::system(text)).await;
                }
            }
        }
        DispatchOutcome::Denied(reason)
    }

    async fn deliver(&self, request: &CommandRequest, result: CommandResult) -> DispatchOutcome {
        if result.message.trim().is_empty() {
            debug!(instance_id = %request.instance_id, "empty result, nothing to send");
            return DispatchOutcome::Executed { replied: false };
        }
        let replied = self.send_reply(request, OutgoingReply::from(result)).await;
        DispatchOutcome::Executed { replied }
    }

    async fn infrastructure_fault(&self, request: &CommandRequest, err: Error) -> DispatchOutcome {
        error!(
            instance_id = %request.instance_id,
            "Failed to process '{}' for user {} on {}: {}",
            request.raw_command_name, request.user_id, request.platform, err
        );
        let language = self.config.default_language.clone();
        self.send_generic_error(request, &language).await;
        DispatchOutcome::InfrastructureFault(err)
    }

    async fn send_generic_error(&self, request: &CommandRequest, language: &str) {
        let text = self.system_text(request, language, system_strings::UNKNOWN_ERROR, &[]);
        self.send_reply(request, OutgoingReply::system(text)).await;
    }

    fn system_text(&self, request: &CommandRequest, language: &str, key: &str, subs: &[(String, String)]) -> String {
        self.localizer
            .get_string(language, key, &request.channel_id, request.platform, subs)
    }

    /// Hands a reply to the platform's sender. Failures are logged, never raised.
    async fn send_reply(&self, request: &CommandRequest, reply: OutgoingReply) -> bool {
        let Some(sender) = self.senders.get(&request.platform) else {
            warn!("No reply sender registered for {}", request.platform);
            return false;
        };
        match sender.send(&request.reply_context, &reply).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    instance_id = %request.instance_id,
                    "Reply to user {} on {} failed: {}",
                    request.user_id, request.platform, e
                );
                false
            }
        }
    }

    async fn publish_usage(&self, request: &CommandRequest, command_name: &str) {
        let Some(bus) = &self.event_bus else { return };
        let usage_text = format!("{} {}", request.raw_command_name, request.arguments_joined)
            .trim()
            .to_string();
        bus.publish(BotEvent::CommandExecuted(CommandUsage {
            usage_id: Uuid::new_v4(),
            instance_id: request.instance_id,
            command_name: command_name.to_string(),
            platform: request.platform,
            channel_id: request.channel_id.clone(),
            user_id: request.user_id.clone(),
            used_at: Utc::now(),
            usage_text: Some(usage_text),
        }))
        .await;
    }
}

type HandlerResult = Result<Option<CommandResult>, Error>;

/// One handler invocation. `straggler` is a blocking thread still running past the timeout.
struct HandlerRun {
    result: HandlerResult,
    straggler: Option<JoinHandle<HandlerResult>>,
}

impl HandlerRun {
    fn finished(result: HandlerResult) -> Self {
        Self { result, straggler: None }
    }
}

async fn run_handler(executor: &CommandExecutor, ctx: CommandContext, limit: Option<Duration>) -> HandlerRun {
    match executor {
        CommandExecutor::Sync(handler) => {
            let handler = Arc::clone(handler);
            let mut thread = tokio::task::spawn_blocking(move || handler.execute(&ctx));
            let joined = match limit {
                Some(limit) => match tokio::time::timeout(limit, &mut thread).await {
                    Ok(joined) => joined,
                    Err(elapsed) => {
                        return HandlerRun { result: Err(Error::Timeout(elapsed)), straggler: Some(thread) };
                    }
                },
                None => thread.await,
            };
            match joined {
                Ok(result) => HandlerRun::finished(result),
                Err(join) if join.is_panic() => {
                    HandlerRun::finished(Err(Error::Panic(panic_message(join.into_panic().as_ref()))))
                }
                Err(join) => HandlerRun::finished(Err(Error::Join(join))),
            }
        }
        CommandExecutor::Async(handler) => {
            let run = AssertUnwindSafe(handler.execute(&ctx)).catch_unwind();
            let caught = match limit {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(caught) => caught,
                    Err(elapsed) => return HandlerRun::finished(Err(Error::Timeout(elapsed))),
                },
                None => run.await,
            };
            match caught {
                Ok(result) => HandlerRun::finished(result),
                Err(panic) => HandlerRun::finished(Err(Error::Panic(panic_message(panic.as_ref())))),
            }
        }
    }
}

fn command_failed(request: &CommandRequest, command: &str, cause: String) -> Error {
    Error::CommandFailed {
        command: command.to_string(),
        arguments: request.arguments_joined.clone(),
        user_id: request.user_id.clone(),
        cause,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
