//! Turns raw platform events into [`CommandRequest`]s.
//!
//! Each platform has its own adapter, but they all share the same text rules
//! implemented by [`parse_command_text`].

pub mod direct;
pub mod guild;
pub mod stream_chat;

use relaybot_common::models::CommandRequest;

pub use direct::{DirectMessage, DirectNormalizer};
pub use guild::{GuildEvent, GuildInteraction, GuildMessage, GuildNormalizer};
pub use stream_chat::{StreamChatMessage, StreamChatNormalizer};

/// Why an event did not become a command request. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text does not start with the channel's prefix.
    NoPrefix,
    /// A bare prefix with nothing after it.
    Empty,
    /// The bot's own message echoed back.
    SelfAuthored,
}

#[derive(Debug, Clone)]
pub enum Normalized {
    Command(CommandRequest),
    Ignored(IgnoreReason),
}

impl Normalized {
    pub fn into_request(self) -> Option<CommandRequest> {
        match self {
            Normalized::Command(req) => Some(req),
            Normalized::Ignored(_) => None,
        }
    }
}

/// Adapter for one platform's raw event type.
pub trait Normalizer: Send + Sync {
    type Event;

    fn normalize(&self, event: &Self::Event) -> Normalized;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub arguments: Vec<String>,
}

/// Splits `"<prefix><name> <args...>"`.
///
/// A prefix followed by whitespace is tolerated: `"!  hello world"` parses as
/// name `hello`, arguments `["world"]`.
pub fn parse_command_text(text: &str, prefix: &str) -> Result<ParsedCommand, IgnoreReason> {
    let rest = text.trim().strip_prefix(prefix).ok_or(IgnoreReason::NoPrefix)?;

    let (name, tail) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let mut arguments: Vec<String> = tail.split_whitespace().map(str::to_string).collect();

    let name = if name.is_empty() {
        if arguments.is_empty() {
            return Err(IgnoreReason::Empty);
        }
        arguments.remove(0)
    } else {
        name.to_string()
    };

    Ok(ParsedCommand { name, arguments })
}

/// Quoted/replied-to text becomes trailing arguments.
pub fn append_quoted(arguments: &mut Vec<String>, quoted: Option<&str>) {
    if let Some(q) = quoted {
        arguments.extend(q.split_whitespace().map(str::to_string));
    }
}
