//! Command and callback routing.
//!
//! Two independent, stateless dispatch tables: exact-match text commands and
//! exact-match callback tokens, each with a total fallback. Every update
//! passes the admin gate before any handler runs.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use crate::{
    domain::ChatId,
    formatting::format_traffic,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, CommandSpec, InlineButton, InlineKeyboard, TextMessage},
    },
    ports::{InboundService, ServerControl, SystemMonitor},
    security::is_admin,
    settings::SettingsPort,
};

/// Menu registered with the transport at start.
pub const COMMAND_MENU: [CommandSpec; 2] = [
    CommandSpec {
        command: "start",
        description: "Start the bot",
    },
    CommandSpec {
        command: "menu",
        description: "Show available options",
    },
];

/// Known text commands. Anything else is the unknown-command fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "/start" => Some(Self::Start),
            "/menu" => Some(Self::Menu),
            _ => None,
        }
    }
}

/// Known inline-menu actions. Anything else is the unknown-option fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Functions,
    Status,
    Restart,
    ClearAll,
    Help,
}

impl MenuAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "functions" => Some(Self::Functions),
            "status" => Some(Self::Status),
            "restart" => Some(Self::Restart),
            "clearall" => Some(Self::ClearAll),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Status => "status",
            Self::Restart => "restart",
            Self::ClearAll => "clearall",
            Self::Help => "help",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::Status => "Status",
            Self::Restart => "Restart",
            Self::ClearAll => "Clear All",
            Self::Help => "Help",
        }
    }

    fn button(self) -> InlineButton {
        InlineButton::new(self.label(), self.token())
    }
}

/// Stateless dispatcher. Cheap to clone; every update handler gets its own
/// clone and runs without synchronization against its siblings.
#[derive(Clone)]
pub struct Router {
    settings: Arc<dyn SettingsPort>,
    messenger: Arc<dyn MessagingPort>,
    inbounds: Arc<dyn InboundService>,
    server: Arc<dyn ServerControl>,
    monitor: Arc<dyn SystemMonitor>,
}

impl Router {
    pub fn new(
        settings: Arc<dyn SettingsPort>,
        messenger: Arc<dyn MessagingPort>,
        inbounds: Arc<dyn InboundService>,
        server: Arc<dyn ServerControl>,
        monitor: Arc<dyn SystemMonitor>,
    ) -> Self {
        Self {
            settings,
            messenger,
            inbounds,
            server,
            monitor,
        }
    }

    pub async fn handle_text(&self, msg: TextMessage) {
        if !is_admin(msg.chat_id, &self.settings.admin_chat_ids()) {
            self.send(msg.chat_id, "You are not authorized to use this bot.")
                .await;
            return;
        }

        match Command::parse(&msg.text) {
            Some(Command::Start) => {
                self.send(msg.chat_id, "Welcome to the panel bot! Use /menu to see options.")
                    .await;
            }
            Some(Command::Menu) => self.show_menu(msg.chat_id).await,
            None => {
                self.send(msg.chat_id, "Unknown command. Use /menu to see options.")
                    .await;
            }
        }
    }

    /// Dispatch one inline-keyboard selection. The callback is acknowledged
    /// exactly once on every path, after handling, whatever the outcome.
    pub async fn handle_callback(&self, cb: CallbackQuery) {
        if !is_admin(cb.chat_id, &self.settings.admin_chat_ids()) {
            self.send(cb.chat_id, "You are not authorized to use this bot.")
                .await;
        } else {
            match MenuAction::parse(&cb.data) {
                Some(MenuAction::Functions) => {
                    self.send(
                        cb.chat_id,
                        "Available functions:\n- Traffic stats\n- Daily reports\n- Server restart",
                    )
                    .await;
                }
                Some(MenuAction::Status) => self.send_status(cb.chat_id).await,
                Some(MenuAction::Restart) => self.restart_server(cb.chat_id).await,
                Some(MenuAction::ClearAll) => self.clear_all(cb.chat_id).await,
                Some(MenuAction::Help) => {
                    self.send(
                        cb.chat_id,
                        "Help:\n/menu - Show options\nContact the panel admin for more info.",
                    )
                    .await;
                }
                None => self.send(cb.chat_id, "Unknown option.").await,
            }
        }

        if let Err(e) = self.messenger.answer_callback(&cb.callback_id).await {
            warn!("failed to acknowledge callback: {e}");
        }
    }

    async fn show_menu(&self, chat_id: ChatId) {
        let keyboard = InlineKeyboard::new(vec![
            vec![
                MenuAction::Functions.button(),
                MenuAction::Status.button(),
            ],
            vec![MenuAction::Restart.button(), MenuAction::ClearAll.button()],
            vec![MenuAction::Help.button()],
        ]);
        if let Err(e) = self
            .messenger
            .send_keyboard(chat_id, "Select an option:", keyboard)
            .await
        {
            warn!("failed to send menu: {e}");
        }
    }

    async fn send_status(&self, chat_id: ChatId) {
        let inbounds = match self.inbounds.all_inbounds().await {
            Ok(v) => v,
            Err(e) => {
                self.send(chat_id, &format!("Failed to get status: {e}")).await;
                return;
            }
        };

        let mut status = String::from("System Status:\n");
        for inbound in &inbounds {
            let _ = writeln!(
                status,
                "Inbound {}: {}",
                inbound.tag,
                format_traffic(inbound.total)
            );
        }
        let _ = writeln!(status, "CPU Usage: {:.2}%", self.monitor.cpu_usage().await);
        self.send(chat_id, &status).await;
    }

    async fn restart_server(&self, chat_id: ChatId) {
        self.send(chat_id, "Restarting the panel...").await;
        if let Err(e) = self.server.stop().await {
            self.send(chat_id, &format!("Failed to stop server: {e}")).await;
            return;
        }
        if let Err(e) = self.server.start().await {
            self.send(chat_id, &format!("Failed to start server: {e}")).await;
            return;
        }
        self.send(chat_id, "Panel restarted successfully.").await;
    }

    async fn clear_all(&self, chat_id: ChatId) {
        self.send(chat_id, "Clearing all traffic counters...").await;
        match self.inbounds.clear_traffic().await {
            Ok(()) => self.send(chat_id, "All traffic counters cleared.").await,
            Err(e) => self.send(chat_id, &format!("Failed to clear data: {e}")).await,
        }
    }

    async fn send(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!("failed to send message: {e}");
        }
    }
}
