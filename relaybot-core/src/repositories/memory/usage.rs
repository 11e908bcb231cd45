use std::collections::VecDeque;
use async_trait::async_trait;
use parking_lot::Mutex;
use relaybot_common::models::CommandUsage;
use relaybot_common::traits::UsageStore;
use relaybot_common::Error;

const DEFAULT_CAPACITY: usize = 1000;

/// Keeps the most recent command usages, oldest dropped first.
pub struct InMemoryUsageStore {
    capacity: usize,
    usages: Mutex<VecDeque<CommandUsage>>,
}

impl InMemoryUsageStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            usages: Mutex::new(VecDeque::new()),
        }
    }

    /// Newest last.
    pub fn recent(&self, limit: usize) -> Vec<CommandUsage> {
        let usages = self.usages.lock();
        let skip = usages.len().saturating_sub(limit);
        usages.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.usages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.usages.lock().is_empty()
    }
}

impl Default for InMemoryUsageStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn record_usages(&self, batch: &[CommandUsage]) -> Result<(), Error> {
        let mut usages = self.usages.lock();
        for usage in batch {
            if usages.len() == self.capacity {
                usages.pop_front();
            }
            usages.push_back(usage.clone());
        }
        Ok(())
    }
}
