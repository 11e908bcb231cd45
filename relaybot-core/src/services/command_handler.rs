use std::sync::Arc;
use async_trait::async_trait;
use relaybot_common::models::{CommandDescriptor, CommandRequest, CommandResult, ExecutionKind, UserAuthorization};

use crate::Error;

/// Everything a command body gets to see about the invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub request: Arc<CommandRequest>,
    pub descriptor: Arc<CommandDescriptor>,
    pub authorization: UserAuthorization,
}

impl CommandContext {
    pub fn args(&self) -> &[String] {
        &self.request.arguments
    }

    pub fn args_joined(&self) -> &str {
        &self.request.arguments_joined
    }

    pub fn language(&self) -> &str {
        &self.authorization.language
    }
}

/// A command body that does only CPU work. Runs on the blocking pool.
///
/// Returning `Ok(None)` means the body produced nothing at all, which the
/// dispatcher treats as a defect and logs.
pub trait SyncCommandHandler: Send + Sync {
    fn execute(&self, ctx: &CommandContext) -> Result<Option<CommandResult>, Error>;
}

/// A command body that awaits I/O.
#[async_trait]
pub trait AsyncCommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext) -> Result<Option<CommandResult>, Error>;
}

#[derive(Clone)]
pub enum CommandExecutor {
    Sync(Arc<dyn SyncCommandHandler>),
    Async(Arc<dyn AsyncCommandHandler>),
}

impl CommandExecutor {
    pub fn sync<H: SyncCommandHandler + 'static>(handler: H) -> Self {
        CommandExecutor::Sync(Arc::new(handler))
    }

    pub fn r#async<H: AsyncCommandHandler + 'static>(handler: H) -> Self {
        CommandExecutor::Async(Arc::new(handler))
    }

    pub fn kind(&self) -> ExecutionKind {
        match self {
            CommandExecutor::Sync(_) => ExecutionKind::Synchronous,
            CommandExecutor::Async(_) => ExecutionKind::Asynchronous,
        }
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandExecutor::Sync(_) => write!(f, "CommandExecutor::Sync"),
            CommandExecutor::Async(_) => write!(f, "CommandExecutor::Async"),
        }
    }
}

/// Plain closures work as synchronous handlers.
impl<F> SyncCommandHandler for F
where
    F: Fn(&CommandContext) -> Result<Option<CommandResult>, Error> + Send + Sync,
{
    fn execute(&self, ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
        self(ctx)
    }
}
