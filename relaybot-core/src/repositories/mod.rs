// File: relaybot-core/src/repositories/mod.rs

pub mod memory;

pub use memory::{InMemoryCooldownStore, InMemoryUsageStore, InMemoryUserStore, StaticLocalizer};
