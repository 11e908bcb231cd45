use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// Where and how a reply should be delivered. Only the platform's reply sender
/// looks inside; the dispatcher passes it through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyContext {
    StreamChat {
        channel_name: String,
        /// Message id to thread the reply under, if the platform supports it.
        reply_to: Option<String>,
    },
    GuildMessage {
        guild_id: Option<String>,
        channel_id: String,
        message_id: String,
    },
    GuildInteraction {
        guild_id: Option<String>,
        channel_id: String,
        interaction_token: String,
    },
    Direct {
        chat_id: String,
        message_id: Option<String>,
    },
}

/// Canonical, platform-independent form of one command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub platform: Platform,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    /// The name exactly as typed, before alias normalization.
    pub raw_command_name: String,
    pub arguments: Vec<String>,
    pub arguments_joined: String,
    pub reply_context: ReplyContext,
    /// Correlation id for logs.
    pub instance_id: Uuid,
}

impl CommandRequest {
    pub fn new(
        platform: Platform,
        channel_id: &str,
        user_id: &str,
        username: &str,
        raw_command_name: &str,
        arguments: Vec<String>,
        reply_context: ReplyContext,
    ) -> Self {
        let arguments_joined = arguments.join(" ");
        Self {
            platform,
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            raw_command_name: raw_command_name.to_string(),
            arguments,
            arguments_joined,
            reply_context,
            instance_id: Uuid::new_v4(),
        }
    }
}
