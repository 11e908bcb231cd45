// File: relaybot-core/src/eventbus/usage_logger_handle.rs
//
// A small control handle for forcing flushes in the usage logger task.

use tokio::sync::{mpsc, oneshot};
use tracing::trace;
use crate::Error;

/// Commands understood by the usage logger's main loop.
#[derive(Debug)]
pub enum UsageLoggerCommand {
    /// Write out the current buffer now. The oneshot is signalled on completion.
    FlushNow(oneshot::Sender<Result<(), Error>>),
}

#[derive(Clone)]
pub struct UsageLoggerControl {
    cmd_tx: mpsc::Sender<UsageLoggerCommand>,
}

impl UsageLoggerControl {
    pub fn new(cmd_tx: mpsc::Sender<UsageLoggerCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Forces a flush of all buffered usages. Fails if the logger task is gone
    /// or the store rejected the batch.
    pub async fn flush_now(&self) -> Result<(), Error> {
        trace!("UsageLoggerControl: flush_now() called.");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(UsageLoggerCommand::FlushNow(reply_tx))
            .await
            .map_err(|_| Error::EventBus("usage logger task is not running".into()))?;

        match reply_rx.await {
            Ok(res) => res,
            Err(_) => Err(Error::EventBus("usage logger dropped the flush request".into())),
        }
    }
}
