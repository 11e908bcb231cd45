use rand::Rng;
use relaybot_common::models::CommandResult;

use crate::services::command_handler::CommandContext;
use crate::Error;

pub fn ping(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(Some(CommandResult::trusted("pong")))
}

/// Repeats the arguments back. User text, so the sender's filter applies.
pub fn echo(ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(Some(CommandResult::text(ctx.args_joined())))
}

pub fn coin(ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    let side = if rand::rng().random_bool(0.5) { "heads" } else { "tails" };
    Ok(Some(CommandResult::trusted(format!("{} flipped {}", ctx.request.username, side))))
}
