use serde::{Serialize, Deserialize};

/// One title/value pair of a rich embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Presentation hints. Platforms that cannot render them ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingHints {
    pub title: Option<String>,
    /// RGB color, e.g. `0x5865F2`.
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
}

/// What a command handler hands back to the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResult {
    pub message: String,
    pub is_error: bool,
    /// Internal failure detail. Logged, never shown to the user.
    pub error: Option<String>,
    /// Skip the sender's content filter (the text is bot-authored and known safe).
    pub safe_to_send_unfiltered: bool,
    pub hints: FormattingHints,
}

impl CommandResult {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Bot-authored text that may bypass content filtering.
    pub fn trusted(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            safe_to_send_unfiltered: true,
            ..Default::default()
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            is_error: true,
            error: Some(detail.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.hints.title = Some(title.into());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.hints.color = Some(color);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.hints.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// The final message handed to a reply sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingReply {
    pub text: String,
    pub hints: FormattingHints,
    pub unfiltered: bool,
}

impl OutgoingReply {
    /// A bot system message (rights, maintenance, generic error).
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: FormattingHints::default(),
            unfiltered: true,
        }
    }
}

impl From<CommandResult> for OutgoingReply {
    fn from(result: CommandResult) -> Self {
        Self {
            text: result.message,
            hints: result.hints,
            unfiltered: result.safe_to_send_unfiltered,
        }
    }
}
