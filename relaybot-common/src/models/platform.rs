// File: relaybot-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// The three messaging platforms the bot listens on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Live-chat stream (IRC-like).
    StreamChat,
    /// Guild-based voice/text platform.
    Guild,
    /// One-to-one and group messaging.
    DirectMessaging,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::StreamChat, Platform::Guild, Platform::DirectMessaging];

    /// Longest single message the platform accepts.
    pub fn max_message_len(&self) -> usize {
        match self {
            Platform::StreamChat => 450,
            Platform::Guild => 2000,
            Platform::DirectMessaging => 4096,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::StreamChat => write!(f, "stream-chat"),
            Platform::Guild => write!(f, "guild"),
            Platform::DirectMessaging => write!(f, "direct-messaging"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stream-chat" | "stream" => Ok(Platform::StreamChat),
            "guild" => Ok(Platform::Guild),
            "direct-messaging" | "direct" | "dm" => Ok(Platform::DirectMessaging),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
