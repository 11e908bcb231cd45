use async_trait::async_trait;
use mockall::automock;

use crate::error::Error;
use crate::models::command::{CommandUsage, CooldownResetPolicy};
use crate::models::platform::Platform;
use crate::models::user::UserAuthorization;

/// Read-only access to user standing and roles.
#[automock]
#[async_trait]
pub trait UserRoleStore: Send + Sync {
    /// Ban/ignore flags, bot-level roles and preferred language.
    /// `is_channel_moderator` is left `false`; use [`UserRoleStore::is_channel_moderator`].
    async fn get_authorization(&self, platform: Platform, user_id: &str) -> Result<UserAuthorization, Error>;

    /// Only meaningful on [`Platform::StreamChat`]; other platforms answer `false`.
    async fn is_channel_moderator(&self, platform: Platform, channel_id: &str, user_id: &str) -> Result<bool, Error>;
}

/// The cooldown ledger.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Atomically checks both windows and, if both have elapsed, records the use.
    /// Returns `false` (and records nothing) when either window is still running.
    async fn try_consume(
        &self,
        command_name: &str,
        user_id: &str,
        channel_id: &str,
        per_user_seconds: u32,
        per_channel_seconds: u32,
        policy: CooldownResetPolicy,
    ) -> Result<bool, Error>;
}

/// Where audited command usages end up.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record_usages(&self, usages: &[CommandUsage]) -> Result<(), Error>;
}
