use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::trace;
use relaybot_common::models::{CommandRequest, Platform, ReplyContext};

use crate::config::ChannelPrefixes;
use super::{append_quoted, parse_command_text, IgnoreReason, Normalized, Normalizer};

/// A prefixed text message in a guild channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMessage {
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    /// Content of the message this one replies to.
    pub referenced_content: Option<String>,
}

/// A slash-style interaction. The platform has already split out the name and options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildInteraction {
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub command_name: String,
    pub options: Vec<String>,
    pub interaction_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GuildEvent {
    Message(GuildMessage),
    Interaction(GuildInteraction),
}

pub struct GuildNormalizer {
    bot_user_id: String,
    prefixes: Arc<ChannelPrefixes>,
}

impl GuildNormalizer {
    pub fn new(bot_user_id: &str, prefixes: Arc<ChannelPrefixes>) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            prefixes,
        }
    }

    fn normalize_message(&self, msg: &GuildMessage) -> Normalized {
        if msg.author_id == self.bot_user_id {
            trace!("guild: dropping own message {}", msg.message_id);
            return Normalized::Ignored(IgnoreReason::SelfAuthored);
        }

        let prefix = self.prefixes.prefix_for(Platform::Guild, &msg.channel_id);
        let mut parsed = match parse_command_text(&msg.content, &prefix) {
            Ok(p) => p,
            Err(reason) => return Normalized::Ignored(reason),
        };
        append_quoted(&mut parsed.arguments, msg.referenced_content.as_deref());

        Normalized::Command(CommandRequest::new(
            Platform::Guild,
            &msg.channel_id,
            &msg.author_id,
            &msg.author_name,
            &parsed.name,
            parsed.arguments,
            ReplyContext::GuildMessage {
                guild_id: msg.guild_id.clone(),
                channel_id: msg.channel_id.clone(),
                message_id: msg.message_id.clone(),
            },
        ))
    }

    fn normalize_interaction(&self, ix: &GuildInteraction) -> Normalized {
        let name = ix.command_name.trim();
        if name.is_empty() {
            return Normalized::Ignored(IgnoreReason::Empty);
        }
        let arguments: Vec<String> = ix
            .options
            .iter()
            .flat_map(|o| o.split_whitespace())
            .map(str::to_string)
            .collect();

        Normalized::Command(CommandRequest::new(
            Platform::Guild,
            &ix.channel_id,
            &ix.user_id,
            &ix.user_name,
            name,
            arguments,
            ReplyContext::GuildInteraction {
                guild_id: ix.guild_id.clone(),
                channel_id: ix.channel_id.clone(),
                interaction_token: ix.interaction_token.clone(),
            },
        ))
    }
}

impl Normalizer for GuildNormalizer {
    type Event = GuildEvent;

    fn normalize(&self, event: &GuildEvent) -> Normalized {
        match event {
            GuildEvent::Message(msg) => self.normalize_message(msg),
            GuildEvent::Interaction(ix) => self.normalize_interaction(ix),
        }
    }
}
