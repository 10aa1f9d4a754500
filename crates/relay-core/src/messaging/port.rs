use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound messaging port.
///
/// Command replies and broadcast deliveries both go through here, so tests can
/// swap in a recording fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send a plain (unformatted) text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
