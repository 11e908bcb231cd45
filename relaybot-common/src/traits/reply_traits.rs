use async_trait::async_trait;
use mockall::automock;

use crate::error::Error;
use crate::models::platform::Platform;
use crate::models::request::ReplyContext;
use crate::models::result::OutgoingReply;

/// Delivers a finished reply on one platform. Implementations split overlong
/// text and apply their own content filter unless `reply.unfiltered` is set.
#[async_trait]
pub trait ReplySender: Send + Sync {
    fn platform(&self) -> Platform;

    async fn send(&self, context: &ReplyContext, reply: &OutgoingReply) -> Result<(), Error>;
}

/// Lookup of the bot's own system strings (rights, errors, maintenance).
#[automock]
pub trait Localizer: Send + Sync {
    fn get_string(
        &self,
        language: &str,
        key: &str,
        channel_id: &str,
        platform: Platform,
        substitutions: &[(String, String)],
    ) -> String;
}
