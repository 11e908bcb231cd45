//! Permission and cooldown policy.
//!
//! Checks run in a fixed order and the first failing one decides:
//! suppression, platform, maintenance, role, cooldown.

use tracing::debug;
use relaybot_common::models::{CommandDescriptor, CommandRequest, UserAuthorization};
use relaybot_common::traits::CooldownStore;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Banned or ignored user. Nothing is sent back.
    Suppressed,
    /// The command is not offered on this platform. Nothing is sent back.
    Unsupported,
    /// The user lacks the required role. A localized rights message is sent.
    InsufficientRole,
    /// A cooldown window is still running. Silent unless the command asks for a notice.
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Do not run the handler; answer with the maintenance message instead.
    Maintenance,
    Deny(DenyReason),
}

/// Everything except the cooldown ledger. Pure.
pub fn check_access(
    descriptor: &CommandDescriptor,
    request: &CommandRequest,
    auth: &UserAuthorization,
) -> GateDecision {
    if auth.is_suppressed() {
        return GateDecision::Deny(DenyReason::Suppressed);
    }
    if !descriptor.supports(request.platform) {
        return GateDecision::Deny(DenyReason::Unsupported);
    }
    if descriptor.under_maintenance {
        return GateDecision::Maintenance;
    }
    if !auth.satisfies(descriptor.required_role) {
        return GateDecision::Deny(DenyReason::InsufficientRole);
    }
    GateDecision::Allow
}

/// Full evaluation. On `Allow` the ledger has already recorded this use.
///
/// Call this while holding the user's execution lock so the consume and the
/// handler run form one unit.
pub async fn evaluate(
    descriptor: &CommandDescriptor,
    request: &CommandRequest,
    auth: &UserAuthorization,
    ledger: &dyn CooldownStore,
) -> Result<GateDecision, Error> {
    let decision = check_access(descriptor, request, auth);
    if decision != GateDecision::Allow || !descriptor.has_cooldown() {
        return Ok(decision);
    }

    let consumed = ledger
        .try_consume(
            &descriptor.name,
            &request.user_id,
            &request.channel_id,
            descriptor.per_user_cooldown_seconds,
            descriptor.per_channel_cooldown_seconds,
            descriptor.cooldown_reset_policy,
        )
        .await?;

    if consumed {
        Ok(GateDecision::Allow)
    } else {
        debug!(
            instance_id = %request.instance_id,
            "'{}' on cooldown for user {} in {}",
            descriptor.name, request.user_id, request.channel_id
        );
        Ok(GateDecision::Deny(DenyReason::RateLimited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_common::models::{Platform, ReplyContext, RequiredRole};

    fn request(platform: Platform) -> CommandRequest {
        CommandRequest::new(
            platform,
            "chan",
            "u1",
            "user",
            "cmd",
            vec![],
            ReplyContext::Direct { chat_id: "chan".into(), message_id: None },
        )
    }

    #[test]
    fn suppression_beats_everything() {
        let d = CommandDescriptor::new("cmd")
            .platforms(&[Platform::Guild])
            .maintenance(true)
            .role(RequiredRole::BotDeveloper);
        let banned = UserAuthorization { is_banned: true, ..Default::default() };
        assert_eq!(
            check_access(&d, &request(Platform::StreamChat), &banned),
            GateDecision::Deny(DenyReason::Suppressed)
        );
        let ignored = UserAuthorization { is_ignored: true, ..Default::default() };
        assert_eq!(
            check_access(&d, &request(Platform::Guild), &ignored),
            GateDecision::Deny(DenyReason::Suppressed)
        );
    }

    #[test]
    fn platform_is_checked_before_maintenance() {
        let d = CommandDescriptor::new("cmd").platforms(&[Platform::Guild]).maintenance(true);
        let auth = UserAuthorization::default();
        assert_eq!(
            check_access(&d, &request(Platform::StreamChat), &auth),
            GateDecision::Deny(DenyReason::Unsupported)
        );
        assert_eq!(check_access(&d, &request(Platform::Guild), &auth), GateDecision::Maintenance);
    }

    #[test]
    fn maintenance_is_checked_before_role() {
        let d = CommandDescriptor::new("cmd").maintenance(true).role(RequiredRole::BotDeveloper);
        assert_eq!(
            check_access(&d, &request(Platform::Guild), &UserAuthorization::default()),
            GateDecision::Maintenance
        );
    }

    #[test]
    fn role_requirement() {
        let d = CommandDescriptor::new("cmd").role(RequiredRole::BotModerator);
        let nobody = UserAuthorization::default();
        let dev = UserAuthorization { is_bot_developer: true, ..Default::default() };
        assert_eq!(
            check_access(&d, &request(Platform::Guild), &nobody),
            GateDecision::Deny(DenyReason::InsufficientRole)
        );
        assert_eq!(check_access(&d, &request(Platform::Guild), &dev), GateDecision::Allow);
    }
}
