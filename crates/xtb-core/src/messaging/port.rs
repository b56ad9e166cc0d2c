use async_trait::async_trait;

use crate::{domain::ContactId, Result};

/// Outbound side of the messenger.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a plain-text chat message.
    async fn send_text(&self, to: &ContactId, body: &str) -> Result<()>;

    /// Ask the server for a sign of life; any reply counts as inbound activity.
    async fn send_probe(&self) -> Result<()>;
}
