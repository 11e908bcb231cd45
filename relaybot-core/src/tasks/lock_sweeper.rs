// relaybot-core/src/tasks/lock_sweeper.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::repositories::InMemoryCooldownStore;
use crate::services::serializer::ExecutionSerializer;

/// Spawns a background task that periodically drops idle per-user locks and,
/// when given, expired cooldown ledger entries.
pub fn spawn_lock_sweep_task(
    serializer: Arc<ExecutionSerializer>,
    cooldowns: Option<Arc<InMemoryCooldownStore>>,
    interval: Duration,
    idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let locks = serializer.sweep_idle(idle);
            let ledger = cooldowns.as_ref().map(|c| c.prune_expired()).unwrap_or(0);
            debug!(
                "sweep: {} idle locks dropped ({} live), {} cooldown entries pruned",
                locks,
                serializer.len(),
                ledger
            );
        }
    })
}
