//! Shared mock ports for the unit tests in this crate.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, InboundSummary},
    messaging::{
        port::MessagingPort,
        types::{CommandSpec, InlineKeyboard},
    },
    ports::{InboundService, ServerControl, SystemMonitor},
    settings::SettingsPort,
    Error, Result,
};

/// Messenger that records everything it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub keyboards: Mutex<Vec<(i64, String, InlineKeyboard)>>,
    pub acks: Mutex<Vec<String>>,
    pub command_menus: AtomicUsize,
    /// Chats whose sends fail with a transport error (and are not recorded).
    pub failing_chats: Mutex<Vec<i64>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn recipients(&self) -> Vec<i64> {
        self.sent.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn ack_count(&self) -> usize {
        self.acks.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    async fn set_my_commands(&self, _commands: &[CommandSpec]) -> Result<()> {
        self.command_menus.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        if self.failing_chats.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::Transport(format!("send to {} refused", chat_id.0)));
        }
        self.sent.lock().unwrap().push((chat_id.0, text.to_string()));
        Ok(())
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        self.keyboards
            .lock()
            .unwrap()
            .push((chat_id.0, text.to_string(), keyboard));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.acks.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

/// In-memory settings with interior mutability so tests can flip values.
pub(crate) struct StaticSettings {
    pub enabled: AtomicBool,
    pub token: Mutex<String>,
    pub chat_ids: Mutex<String>,
    pub schedule: Mutex<String>,
}

impl StaticSettings {
    pub fn new(enabled: bool, chat_ids: &str) -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(enabled),
            token: Mutex::new("test-token".to_string()),
            chat_ids: Mutex::new(chat_ids.to_string()),
            schedule: Mutex::new(String::new()),
        })
    }
}

impl SettingsPort for StaticSettings {
    fn bot_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn bot_token(&self) -> String {
        self.token.lock().unwrap().clone()
    }

    fn admin_chat_ids(&self) -> String {
        self.chat_ids.lock().unwrap().clone()
    }

    fn report_schedule(&self) -> String {
        self.schedule.lock().unwrap().clone()
    }
}

/// Panel services with scriptable failures.
#[derive(Default)]
pub(crate) struct ScriptedPanel {
    pub inbounds: Mutex<Vec<InboundSummary>>,
    pub list_error: Mutex<Option<String>>,
    pub clear_error: Mutex<Option<String>>,
    pub stop_error: Mutex<Option<String>>,
    pub start_error: Mutex<Option<String>>,
    pub cleared: AtomicBool,
}

impl ScriptedPanel {
    pub fn new(inbounds: Vec<InboundSummary>) -> Arc<Self> {
        Arc::new(Self {
            inbounds: Mutex::new(inbounds),
            ..Self::default()
        })
    }
}

#[async_trait]
impl InboundService for ScriptedPanel {
    async fn all_inbounds(&self) -> Result<Vec<InboundSummary>> {
        if let Some(msg) = self.list_error.lock().unwrap().clone() {
            return Err(Error::Service(msg));
        }
        Ok(self.inbounds.lock().unwrap().clone())
    }

    async fn clear_traffic(&self) -> Result<()> {
        if let Some(msg) = self.clear_error.lock().unwrap().clone() {
            return Err(Error::Service(msg));
        }
        self.cleared.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ServerControl for ScriptedPanel {
    async fn stop(&self) -> Result<()> {
        if let Some(msg) = self.stop_error.lock().unwrap().clone() {
            return Err(Error::Service(msg));
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        if let Some(msg) = self.start_error.lock().unwrap().clone() {
            return Err(Error::Service(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl SystemMonitor for ScriptedPanel {
    async fn cpu_usage(&self) -> f64 {
        45.5
    }
}
