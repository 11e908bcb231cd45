// ================================================================
// File: relaybot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    /// Two descriptors claimed the same alias (after normalization).
    #[error("Duplicate alias '{alias}': already registered by '{existing}', rejected for '{rejected}'")]
    DuplicateAlias {
        alias: String,
        existing: String,
        rejected: String,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    /// A collaborator store (users, roles, cooldowns) could not answer.
    #[error("Store error: {0}")]
    Store(String),

    /// A command body failed. Carries enough context to diagnose from the log alone.
    #[error("Command '{command}' failed for user '{user_id}' (args: '{arguments}'): {cause}")]
    CommandFailed {
        command: String,
        arguments: String,
        user_id: String,
        cause: String,
    },

    /// A command body panicked. Holds the panic message when it was a string.
    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Event bus error: {0}")]
    EventBus(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
