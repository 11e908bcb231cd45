// File: relaybot-common/src/models/mod.rs
pub mod command;
pub mod platform;
pub mod request;
pub mod result;
pub mod user;

pub use command::{CommandDescriptor, CommandUsage, CooldownResetPolicy, ExecutionKind, RequiredRole};
pub use platform::Platform;
pub use request::{CommandRequest, ReplyContext};
pub use result::{CommandResult, EmbedField, FormattingHints, OutgoingReply};
pub use user::{UserAuthorization, DEFAULT_LANGUAGE};
