use async_trait::async_trait;
use relaybot_common::models::CommandResult;

use crate::services::command_handler::{AsyncCommandHandler, CommandContext};
use crate::Error;

/// Reports how the bot sees the caller.
pub struct WhoAmI;

#[async_trait]
impl AsyncCommandHandler for WhoAmI {
    async fn execute(&self, ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
        let req = &ctx.request;
        let auth = &ctx.authorization;
        let result = CommandResult::text(format!("{} ({} on {})", req.username, req.user_id, req.platform))
            .with_title("whoami")
            .with_field("role", format!("{:?}", auth.role_level()), true)
            .with_field("language", ctx.language(), true);
        Ok(Some(result))
    }
}
