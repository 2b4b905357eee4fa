//! Telegram adapter (teloxide).
//!
//! Implements the core `MessagingPort` over the Telegram Bot API and feeds
//! the core update stream from a long-polling dispatcher.

use std::sync::Arc;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup},
};

use panelbot_core::{
    domain::ChatId,
    errors::Error,
    messaging::{
        port::{Gateway, MessagingConnector, MessagingPort},
        types::{CommandSpec, InlineKeyboard},
    },
    Result,
};

mod updates;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn set_my_commands(&self, commands: &[CommandSpec]) -> Result<()> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|c| BotCommand::new(c.command, c.description))
            .collect();
        self.bot
            .set_my_commands(commands)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();

        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .reply_markup(InlineKeyboardMarkup::new(rows))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(callback_id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}

/// Builds a connected Telegram gateway. A rejected token surfaces as
/// `Error::Auth` before any update is consumed.
pub struct TelegramConnector;

#[async_trait]
impl MessagingConnector for TelegramConnector {
    async fn connect(&self, token: &str) -> Result<Gateway> {
        let bot = Bot::new(token.to_string());
        let me = bot
            .get_me()
            .await
            .map_err(|e| Error::Auth(format!("telegram rejected the bot token: {e}")))?;
        tracing::info!("telegram bot authenticated as @{}", me.username());

        let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
        let updates = updates::spawn_update_feed(bot);

        Ok(Gateway { messenger, updates })
    }
}
