//! Console stand-in for a stream-chat connection: stdin lines in, stdout replies out.

use async_trait::async_trait;

use relaybot_common::models::{OutgoingReply, Platform, ReplyContext};
use relaybot_common::traits::ReplySender;
use relaybot_core::eventbus::BotEvent;
use relaybot_core::services::message_sender::split_for_platform;
use relaybot_core::services::normalizers::StreamChatMessage;
use relaybot_core::Error;
use uuid::Uuid;

pub const CONSOLE_CHANNEL_ID: &str = "console";

pub struct ConsoleReplySender;

impl ConsoleReplySender {
    pub fn new() -> Self {
        Self
    }
}

/// Drops control characters from text the bot did not write itself.
fn filter(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

#[async_trait]
impl ReplySender for ConsoleReplySender {
    fn platform(&self) -> Platform {
        Platform::StreamChat
    }

    async fn send(&self, context: &ReplyContext, reply: &OutgoingReply) -> Result<(), Error> {
        let ReplyContext::StreamChat { channel_name, .. } = context else {
            return Err(Error::Platform(format!("console cannot deliver to {:?}", context)));
        };
        let text = if reply.unfiltered { reply.text.clone() } else { filter(&reply.text) };
        for chunk in split_for_platform(&text, Platform::StreamChat) {
            println!("[#{}] {}", channel_name, chunk);
        }
        Ok(())
    }
}

/// One stdin line as a chat message. `@name rest` speaks as `name`.
pub fn line_to_message(line: &str, channel: &str, default_user: &str) -> Option<StreamChatMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (user, text) = match line.strip_prefix('@').and_then(|rest| rest.split_once(char::is_whitespace)) {
        Some((user, text)) if !user.is_empty() => (user, text.trim()),
        _ => (default_user, line),
    };
    Some(StreamChatMessage {
        channel_id: CONSOLE_CHANNEL_ID.to_string(),
        channel_name: channel.to_string(),
        message_id: Some(Uuid::new_v4().to_string()),
        user_id: user.to_string(),
        username: user.to_string(),
        display_name: None,
        text: text.to_string(),
        reply_parent_text: None,
    })
}

/// One-line rendering of audit events for the console log.
pub fn describe_event(event: &BotEvent) -> Option<String> {
    match event {
        BotEvent::CommandCompleted { command, user_id, elapsed_ms, outcome, .. } => {
            Some(format!("{} by {} -> {} ({} ms)", command, user_id, outcome, elapsed_ms))
        }
        _ => None,
    }
}
