use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::ChatId,
    messaging::{
        types::{CommandSpec, InlineKeyboard},
        updates::UpdateStream,
    },
    Result,
};

/// Outbound side of the messaging transport.
///
/// All sends are fire-and-forget from the caller's perspective: failures are
/// reported back but never retried by the gateway.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn set_my_commands(&self, commands: &[CommandSpec]) -> Result<()>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// A connected transport: the send handle plus the live update sequence.
pub struct Gateway {
    pub messenger: Arc<dyn MessagingPort>,
    pub updates: UpdateStream,
}

/// Builds a `Gateway` from a token. Implemented by transport adapters;
/// rejected credentials surface as `Error::Auth`, which is fatal to start.
#[async_trait]
pub trait MessagingConnector: Send + Sync {
    async fn connect(&self, token: &str) -> Result<Gateway>;
}
