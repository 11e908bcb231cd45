//! Commands that ship with the bot, registered at compile time.

pub mod basic;
pub mod whoami;

use relaybot_common::models::{CommandDescriptor, ExecutionKind};

use crate::services::command_handler::CommandExecutor;
use crate::services::command_registry::RegistryBuilder;
use crate::Error;

/// Catalog for [`crate::services::command_registry::CommandRegistry::new`].
pub fn register_builtins(builder: &mut RegistryBuilder) -> Result<(), Error> {
    builder
        .register(
            CommandDescriptor::new("ping"),
            CommandExecutor::sync(basic::ping),
        )?
        .register(
            CommandDescriptor::new("echo").aliases(&["say"]).cooldown(5, 0),
            CommandExecutor::sync(basic::echo),
        )?
        .register(
            CommandDescriptor::new("coin").aliases(&["flip"]).cooldown(0, 3),
            CommandExecutor::sync(basic::coin),
        )?
        .register(
            CommandDescriptor::new("whoami")
                .aliases(&["me"])
                .kind(ExecutionKind::Asynchronous),
            CommandExecutor::r#async(whoami::WhoAmI),
        )?;
    Ok(())
}
