//! Per-user execution locks.
//!
//! A user never has two commands running at once, whichever platforms they
//! arrive from. Different users never wait on each other.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

struct UserSlot {
    lock: tokio::sync::Mutex<()>,
    last_used: Mutex<Instant>,
}

impl UserSlot {
    fn new() -> Self {
        Self {
            lock: tokio::sync::Mutex::new(()),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }
}

#[derive(Default)]
pub struct ExecutionSerializer {
    slots: DashMap<String, Arc<UserSlot>>,
}

impl ExecutionSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` while holding `user_id`'s lock, creating the lock on first use.
    ///
    /// Waiters are served in arrival order. The lock is released when `action`
    /// finishes, panics, or the returned future is dropped.
    pub async fn with_user_lock<F, T>(&self, user_id: &str, action: F) -> T
    where
        F: Future<Output = T>,
    {
        // The clone happens under the shard lock, which is what makes the sweep safe.
        let slot = self
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(UserSlot::new()))
            .clone();

        let _guard = slot.lock.lock().await;
        trace!("execution lock acquired for user {}", user_id);
        slot.touch();
        let out = action.await;
        slot.touch();
        out
    }

    /// Removes locks nobody holds or waits on that have been idle for at least `idle`.
    ///
    /// An entry whose `Arc` has any clone outside the map is kept, and an acquirer
    /// can only clone while holding the same shard lock `retain` holds, so a lock
    /// is never dropped out from under a concurrent acquire.
    pub fn sweep_idle(&self, idle: Duration) -> usize {
        let mut removed = 0;
        self.slots.retain(|_, slot| {
            let keep = Arc::strong_count(slot) > 1 || slot.idle_for() < idle;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!("execution serializer: dropped {} idle user locks ({} remain)", removed, self.slots.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
