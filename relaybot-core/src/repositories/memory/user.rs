use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use relaybot_common::models::{Platform, UserAuthorization};
use relaybot_common::traits::UserRoleStore;

use crate::Error;

/// Process-local user/role records. Unknown users get the default snapshot.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<(Platform, String), UserAuthorization>,
    /// (channel_id, user_id) pairs on the stream platform.
    channel_moderators: DashSet<(String, String)>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authorization(&self, platform: Platform, user_id: &str, auth: UserAuthorization) {
        self.users.insert((platform, user_id.to_string()), auth);
    }

    /// Applies `f` to the stored snapshot, creating a default one first if needed.
    pub fn update<F: FnOnce(&mut UserAuthorization)>(&self, platform: Platform, user_id: &str, f: F) {
        let mut entry = self.users.entry((platform, user_id.to_string())).or_default();
        f(entry.value_mut());
    }

    pub fn ban(&self, platform: Platform, user_id: &str) {
        self.update(platform, user_id, |a| a.is_banned = true);
    }

    pub fn ignore(&self, platform: Platform, user_id: &str) {
        self.update(platform, user_id, |a| a.is_ignored = true);
    }

    pub fn grant_developer(&self, platform: Platform, user_id: &str) {
        self.update(platform, user_id, |a| a.is_bot_developer = true);
    }

    pub fn grant_moderator(&self, platform: Platform, user_id: &str) {
        self.update(platform, user_id, |a| a.is_bot_moderator = true);
    }

    pub fn set_language(&self, platform: Platform, user_id: &str, language: &str) {
        self.update(platform, user_id, |a| a.language = language.to_string());
    }

    pub fn grant_channel_moderator(&self, channel_id: &str, user_id: &str) {
        self.channel_moderators.insert((channel_id.to_string(), user_id.to_string()));
    }

    pub fn revoke_channel_moderator(&self, channel_id: &str, user_id: &str) {
        self.channel_moderators.remove(&(channel_id.to_string(), user_id.to_string()));
    }
}

#[async_trait]
impl UserRoleStore for InMemoryUserStore {
    async fn get_authorization(&self, platform: Platform, user_id: &str) -> Result<UserAuthorization, Error> {
        let mut auth = self
            .users
            .get(&(platform, user_id.to_string()))
            .map(|a| a.value().clone())
            .unwrap_or_default();
        auth.is_channel_moderator = false;
        Ok(auth)
    }

    async fn is_channel_moderator(&self, platform: Platform, channel_id: &str, user_id: &str) -> Result<bool, Error> {
        if platform != Platform::StreamChat {
            return Ok(false);
        }
        Ok(self.channel_moderators.contains(&(channel_id.to_string(), user_id.to_string())))
    }
}
