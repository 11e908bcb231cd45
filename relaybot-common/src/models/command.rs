use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// Minimum role a user must hold to run a command.
///
/// Ordered weakest to strongest: a stronger role satisfies every weaker requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    #[default]
    None,
    ChannelModerator,
    BotModerator,
    BotDeveloper,
}

/// How a cooldown window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CooldownResetPolicy {
    /// One use per fixed wall-clock bucket of `seconds` length.
    Window,
    /// Refuse until `seconds` have fully elapsed since the last use.
    #[default]
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    Synchronous,
    Asynchronous,
}

/// Immutable metadata for one chat command (e.g. `!ping`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub required_role: RequiredRole,
    pub per_user_cooldown_seconds: u32,
    pub per_channel_cooldown_seconds: u32,
    pub cooldown_reset_policy: CooldownResetPolicy,
    pub platforms: Vec<Platform>,
    pub execution_kind: ExecutionKind,
    pub under_maintenance: bool,
    /// Reply with a short notice instead of staying silent when rate limited.
    pub notify_on_cooldown: bool,
}

impl CommandDescriptor {
    /// A synchronous, unrestricted command available on every platform.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            required_role: RequiredRole::None,
            per_user_cooldown_seconds: 0,
            per_channel_cooldown_seconds: 0,
            cooldown_reset_policy: CooldownResetPolicy::Strict,
            platforms: Platform::ALL.to_vec(),
            execution_kind: ExecutionKind::Synchronous,
            under_maintenance: false,
            notify_on_cooldown: false,
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn role(mut self, role: RequiredRole) -> Self {
        self.required_role = role;
        self
    }

    pub fn cooldown(mut self, per_user_seconds: u32, per_channel_seconds: u32) -> Self {
        self.per_user_cooldown_seconds = per_user_seconds;
        self.per_channel_cooldown_seconds = per_channel_seconds;
        self
    }

    pub fn reset_policy(mut self, policy: CooldownResetPolicy) -> Self {
        self.cooldown_reset_policy = policy;
        self
    }

    pub fn platforms(mut self, platforms: &[Platform]) -> Self {
        self.platforms = platforms.to_vec();
        self
    }

    pub fn kind(mut self, kind: ExecutionKind) -> Self {
        self.execution_kind = kind;
        self
    }

    pub fn maintenance(mut self, under_maintenance: bool) -> Self {
        self.under_maintenance = under_maintenance;
        self
    }

    pub fn notify_on_cooldown(mut self, notify: bool) -> Self {
        self.notify_on_cooldown = notify;
        self
    }

    /// The name followed by every alias, in declaration order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn has_cooldown(&self) -> bool {
        self.per_user_cooldown_seconds > 0 || self.per_channel_cooldown_seconds > 0
    }
}

/// Audit record emitted when a user invokes a command that passed the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandUsage {
    pub usage_id: Uuid,
    pub instance_id: Uuid,
    pub command_name: String,
    pub platform: Platform,
    pub channel_id: String,
    pub user_id: String,
    pub used_at: DateTime<Utc>,
    pub usage_text: Option<String>,
}
