// relaybot-core/src/config.rs

use std::time::Duration;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use relaybot_common::models::{Platform, DEFAULT_LANGUAGE};

pub const DEFAULT_PREFIX: &str = "!";

/// Tunables for the dispatcher and its background tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Language for system messages when the user's own language is unavailable.
    pub default_language: String,
    /// Upper bound on a single handler run. `0` disables the limit.
    pub handler_timeout_secs: u64,
    /// Idle time after which an unused per-user lock is dropped.
    pub lock_idle_secs: u64,
    /// How often the lock sweeper runs.
    pub lock_sweep_interval_secs: u64,
    /// Platform events processed concurrently before new ones wait for a slot.
    pub max_in_flight_events: usize,
    /// Test deployments skip the command audit events.
    pub test_mode: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            handler_timeout_secs: 30,
            lock_idle_secs: 600,
            lock_sweep_interval_secs: 60,
            max_in_flight_events: 256,
            test_mode: false,
        }
    }
}

impl DispatcherConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        match self.handler_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn lock_idle(&self) -> Duration {
        Duration::from_secs(self.lock_idle_secs)
    }

    pub fn lock_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lock_sweep_interval_secs.max(1))
    }
}

/// Command prefix per channel, falling back to a bot-wide default.
#[derive(Debug)]
pub struct ChannelPrefixes {
    default_prefix: String,
    overrides: DashMap<(Platform, String), String>,
}

impl ChannelPrefixes {
    pub fn new(default_prefix: &str) -> Self {
        Self {
            default_prefix: default_prefix.to_string(),
            overrides: DashMap::new(),
        }
    }

    pub fn set(&self, platform: Platform, channel_id: &str, prefix: &str) {
        self.overrides.insert((platform, channel_id.to_string()), prefix.to_string());
    }

    pub fn clear(&self, platform: Platform, channel_id: &str) {
        self.overrides.remove(&(platform, channel_id.to_string()));
    }

    pub fn prefix_for(&self, platform: Platform, channel_id: &str) -> String {
        self.overrides
            .get(&(platform, channel_id.to_string()))
            .map(|p| p.value().clone())
            .unwrap_or_else(|| self.default_prefix.clone())
    }
}

impl Default for ChannelPrefixes {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
