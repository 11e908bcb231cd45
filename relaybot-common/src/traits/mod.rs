pub mod reply_traits;
pub mod store_traits;

pub use reply_traits::{Localizer, MockLocalizer, ReplySender};
pub use store_traits::{CooldownStore, MockUserRoleStore, UsageStore, UserRoleStore};
