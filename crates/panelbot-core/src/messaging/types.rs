use crate::domain::ChatId;

/// Transport-agnostic incoming update model.
///
/// Transport-specific fields stay in the adapter; the core only routes on
/// message text and callback tokens.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Text(TextMessage),
    Callback(CallbackQuery),
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub text: String,
}

/// An inline-keyboard selection. `callback_id` must be acknowledged exactly
/// once so the originating client stops showing its loading indicator.
#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub callback_id: String,
    pub data: String,
}

/// Inline keyboard with explicit row structure.
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// One entry of the command menu registered with the transport.
#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    /// Command name without the leading slash.
    pub command: &'static str,
    pub description: &'static str,
}
