use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use relaybot_common::models::CooldownResetPolicy;
use relaybot_common::traits::CooldownStore;

use crate::Error;
use crate::utils::time::{bucket_start, Clock, SystemClock};

#[derive(Debug, Clone, Copy)]
struct Stamp {
    at: DateTime<Utc>,
    /// After this instant the stamp can no longer block anything.
    expires_at: DateTime<Utc>,
}

impl Stamp {
    fn new(at: DateTime<Utc>, seconds: u32, policy: CooldownResetPolicy) -> Self {
        let expires_at = match policy {
            CooldownResetPolicy::Strict => at + Duration::seconds(seconds as i64),
            CooldownResetPolicy::Window => {
                let start = bucket_start(at, seconds);
                DateTime::from_timestamp(start + seconds as i64, 0).unwrap_or(at)
            }
        };
        Self { at, expires_at }
    }
}

#[derive(Debug, Default)]
struct ChannelLedger {
    channel: Option<Stamp>,
    users: HashMap<String, Stamp>,
}

impl ChannelLedger {
    fn is_empty(&self) -> bool {
        self.channel.is_none() && self.users.is_empty()
    }
}

fn window_elapsed(last: Option<&Stamp>, now: DateTime<Utc>, seconds: u32, policy: CooldownResetPolicy) -> bool {
    let Some(last) = last else {
        return true;
    };
    if seconds == 0 {
        return true;
    }
    match policy {
        CooldownResetPolicy::Strict => now - last.at >= Duration::seconds(seconds as i64),
        CooldownResetPolicy::Window => bucket_start(now, seconds) > bucket_start(last.at, seconds),
    }
}

/// Cooldown ledger keyed by (command, channel), holding the channel-wide stamp
/// and one stamp per user. Each key is updated under its shard lock, so the
/// check and the write cannot interleave with another consume for the same key.
pub struct InMemoryCooldownStore {
    entries: DashMap<(String, String), ChannelLedger>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drops stamps whose windows have passed. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, ledger| {
            if ledger.channel.is_some_and(|s| s.expires_at <= now) {
                ledger.channel = None;
                removed += 1;
            }
            let before = ledger.users.len();
            ledger.users.retain(|_, s| s.expires_at > now);
            removed += before - ledger.users.len();
            !ledger.is_empty()
        });
        if removed > 0 {
            debug!("cooldown ledger: pruned {} expired stamps", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.users.len() + e.channel.is_some() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryCooldownStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn try_consume(
        &self,
        command_name: &str,
        user_id: &str,
        channel_id: &str,
        per_user_seconds: u32,
        per_channel_seconds: u32,
        policy: CooldownResetPolicy,
    ) -> Result<bool, Error> {
        if per_user_seconds == 0 && per_channel_seconds == 0 {
            return Ok(true);
        }
        let now = self.clock.now();
        let key = (command_name.to_lowercase(), channel_id.to_string());
        let mut entry = self.entries.entry(key).or_default();
        let ledger = entry.value_mut();

        let user_ok = window_elapsed(ledger.users.get(user_id), now, per_user_seconds, policy);
        let channel_ok = window_elapsed(ledger.channel.as_ref(), now, per_channel_seconds, policy);
        if !(user_ok && channel_ok) {
            return Ok(false);
        }

        if per_user_seconds > 0 {
            ledger.users.insert(user_id.to_string(), Stamp::new(now, per_user_seconds, policy));
        }
        if per_channel_seconds > 0 {
            ledger.channel = Some(Stamp::new(now, per_channel_seconds, policy));
        }
        Ok(true)
    }
}
