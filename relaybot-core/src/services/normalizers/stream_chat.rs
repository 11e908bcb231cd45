use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::trace;
use relaybot_common::models::{CommandRequest, Platform, ReplyContext};

use crate::config::ChannelPrefixes;
use super::{append_quoted, parse_command_text, IgnoreReason, Normalized, Normalizer};

/// A chat line from the live stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChatMessage {
    pub channel_id: String,
    pub channel_name: String,
    pub message_id: Option<String>,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub text: String,
    /// Body of the message this one replies to.
    pub reply_parent_text: Option<String>,
}

pub struct StreamChatNormalizer {
    bot_user_id: String,
    prefixes: Arc<ChannelPrefixes>,
}

impl StreamChatNormalizer {
    pub fn new(bot_user_id: &str, prefixes: Arc<ChannelPrefixes>) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            prefixes,
        }
    }
}

impl Normalizer for StreamChatNormalizer {
    type Event = StreamChatMessage;

    fn normalize(&self, msg: &StreamChatMessage) -> Normalized {
        if msg.user_id == self.bot_user_id {
            trace!("stream-chat: dropping own message in #{}", msg.channel_name);
            return Normalized::Ignored(IgnoreReason::SelfAuthored);
        }

        let prefix = self.prefixes.prefix_for(Platform::StreamChat, &msg.channel_id);
        let mut parsed = match parse_command_text(&msg.text, &prefix) {
            Ok(p) => p,
            Err(reason) => return Normalized::Ignored(reason),
        };
        append_quoted(&mut parsed.arguments, msg.reply_parent_text.as_deref());

        let username = msg.display_name.as_deref().unwrap_or(&msg.username);
        Normalized::Command(CommandRequest::new(
            Platform::StreamChat,
            &msg.channel_id,
            &msg.user_id,
            username,
            &parsed.name,
            parsed.arguments,
            ReplyContext::StreamChat {
                channel_name: msg.channel_name.clone(),
                reply_to: msg.message_id.clone(),
            },
        ))
    }
}
