pub mod cooldown;
pub mod localization;
pub mod usage;
pub mod user;

pub use cooldown::InMemoryCooldownStore;
pub use localization::StaticLocalizer;
pub use usage::InMemoryUsageStore;
pub use user::InMemoryUserStore;
