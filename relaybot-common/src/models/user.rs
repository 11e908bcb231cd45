use serde::{Serialize, Deserialize};

use crate::models::command::RequiredRole;

/// Fallback language for system messages when the user's language is unknown.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Per-request view of a user's standing, resolved once from the user/role store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAuthorization {
    pub is_banned: bool,
    pub is_ignored: bool,
    pub is_bot_developer: bool,
    pub is_bot_moderator: bool,
    /// Only ever set on the stream platform.
    pub is_channel_moderator: bool,
    pub language: String,
}

impl Default for UserAuthorization {
    fn default() -> Self {
        Self {
            is_banned: false,
            is_ignored: false,
            is_bot_developer: false,
            is_bot_moderator: false,
            is_channel_moderator: false,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl UserAuthorization {
    pub fn is_suppressed(&self) -> bool {
        self.is_banned || self.is_ignored
    }

    /// The strongest role this user holds.
    pub fn role_level(&self) -> RequiredRole {
        if self.is_bot_developer {
            RequiredRole::BotDeveloper
        } else if self.is_bot_moderator {
            RequiredRole::BotModerator
        } else if self.is_channel_moderator {
            RequiredRole::ChannelModerator
        } else {
            RequiredRole::None
        }
    }

    pub fn satisfies(&self, required: RequiredRole) -> bool {
        self.role_level() >= required
    }
}
