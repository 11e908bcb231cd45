use std::sync::Arc;
use serde::{Deserialize, Serialize};
use relaybot_common::models::{CommandRequest, Platform, ReplyContext};

use crate::config::ChannelPrefixes;
use super::{append_quoted, parse_command_text, IgnoreReason, Normalized, Normalizer};

/// A message in a one-to-one or group chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub chat_id: String,
    pub message_id: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    /// Set by the client library for messages the bot account itself sent.
    pub is_outgoing: bool,
    pub text: String,
    pub reply_to_text: Option<String>,
}

pub struct DirectNormalizer {
    bot_user_id: String,
    prefixes: Arc<ChannelPrefixes>,
}

impl DirectNormalizer {
    pub fn new(bot_user_id: &str, prefixes: Arc<ChannelPrefixes>) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            prefixes,
        }
    }
}

impl Normalizer for DirectNormalizer {
    type Event = DirectMessage;

    fn normalize(&self, msg: &DirectMessage) -> Normalized {
        if msg.is_outgoing || msg.sender_id == self.bot_user_id {
            return Normalized::Ignored(IgnoreReason::SelfAuthored);
        }

        let prefix = self.prefixes.prefix_for(Platform::DirectMessaging, &msg.chat_id);
        let mut parsed = match parse_command_text(&msg.text, &prefix) {
            Ok(p) => p,
            Err(reason) => return Normalized::Ignored(reason),
        };
        append_quoted(&mut parsed.arguments, msg.reply_to_text.as_deref());

        Normalized::Command(CommandRequest::new(
            Platform::DirectMessaging,
            &msg.chat_id,
            &msg.sender_id,
            &msg.sender_name,
            &parsed.name,
            parsed.arguments,
            ReplyContext::Direct {
                chat_id: msg.chat_id.clone(),
                message_id: msg.message_id.clone(),
            },
        ))
    }
}
