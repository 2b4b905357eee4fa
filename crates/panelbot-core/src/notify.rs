//! Notification fan-out to the configured admin chats.
//!
//! Alert producers elsewhere in the panel call the `notify_*` methods on
//! domain events; each is a no-op while the bot is disabled or has never
//! connected. Delivery is per-recipient independent: one failed send is
//! logged and the remaining recipients still get their copy.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::{
    domain::ChatId,
    formatting::format_traffic,
    messaging::port::MessagingPort,
    ports::InboundService,
    security::parse_chat_ids,
    settings::SettingsPort,
};

pub struct Notifier {
    settings: Arc<dyn SettingsPort>,
    inbounds: Arc<dyn InboundService>,
    gateway: RwLock<Option<Arc<dyn MessagingPort>>>,
}

impl Notifier {
    pub fn new(settings: Arc<dyn SettingsPort>, inbounds: Arc<dyn InboundService>) -> Self {
        Self {
            settings,
            inbounds,
            gateway: RwLock::new(None),
        }
    }

    /// Hand the notifier the live gateway. Called by the bot session once the
    /// transport is connected; the slot stays populated across a stop so that
    /// late alerts behave like the disabled check dictates.
    pub(crate) async fn attach(&self, messenger: Arc<dyn MessagingPort>) {
        *self.gateway.write().await = Some(messenger);
    }

    async fn current_gateway(&self) -> Option<Arc<dyn MessagingPort>> {
        if !self.settings.bot_enabled() {
            return None;
        }
        self.gateway.read().await.clone()
    }

    /// Send `text` to every configured admin chat. Malformed ids are skipped
    /// silently; a failure for one recipient never blocks the rest.
    pub async fn broadcast(&self, text: &str) {
        let Some(gateway) = self.current_gateway().await else {
            return;
        };

        for id in parse_chat_ids(&self.settings.admin_chat_ids()) {
            if let Err(e) = gateway.send_text(ChatId(id), text).await {
                warn!("notification to chat {id} failed: {e}");
            }
        }
    }

    pub async fn notify_login(&self, username: &str, source_addr: &str) {
        let stamp = Local::now().to_rfc2822();
        self.broadcast(&format!(
            "User {username} logged in from IP {source_addr} at {stamp}"
        ))
        .await;
    }

    pub async fn notify_traffic_limit(&self, inbound_tag: &str, total: i64) {
        self.broadcast(&format!(
            "Inbound {inbound_tag} has reached traffic limit: {}",
            format_traffic(total)
        ))
        .await;
    }

    pub async fn notify_expiring_soon(&self, inbound_tag: &str, days_left: i64) {
        self.broadcast(&format!(
            "Inbound {inbound_tag} will expire in {days_left} days."
        ))
        .await;
    }

    pub async fn notify_cpu_load(&self, usage_percent: f64) {
        self.broadcast(&format!(
            "CPU load has exceeded threshold: {usage_percent:.2}%"
        ))
        .await;
    }

    /// Build and broadcast the daily traffic report, one multi-line message
    /// per recipient. Invoked by the scheduler on its own timer.
    pub(crate) async fn send_daily_report(&self) {
        let inbounds = match self.inbounds.all_inbounds().await {
            Ok(v) => v,
            Err(e) => {
                error!("failed to get inbounds for the daily report: {e}");
                return;
            }
        };

        let mut report = String::from("Daily Traffic Report:\n");
        for inbound in &inbounds {
            let _ = writeln!(report, "{}: {}", inbound.tag, format_traffic(inbound.total));
        }
        self.broadcast(&report).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InboundSummary;
    use crate::testutil::{RecordingMessenger, ScriptedPanel, StaticSettings};

    async fn notifier_with(
        enabled: bool,
        chat_ids: &str,
        inbounds: Vec<InboundSummary>,
    ) -> (Notifier, Arc<RecordingMessenger>) {
        let messenger = RecordingMessenger::new();
        let notifier = Notifier::new(
            StaticSettings::new(enabled, chat_ids),
            ScriptedPanel::new(inbounds),
        );
        notifier.attach(messenger.clone()).await;
        (notifier, messenger)
    }

    #[tokio::test]
    async fn broadcast_skips_malformed_ids_and_reaches_valid_ones() {
        let (notifier, messenger) = notifier_with(true, "111,abc,222", vec![]).await;

        notifier.broadcast("ping").await;

        assert_eq!(messenger.recipients(), vec![111, 222]);
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_block_the_rest() {
        let (notifier, messenger) = notifier_with(true, "111,222,333", vec![]).await;
        messenger.failing_chats.lock().unwrap().push(222);

        notifier.broadcast("ping").await;

        assert_eq!(messenger.recipients(), vec![111, 333]);
    }

    #[tokio::test]
    async fn disabled_bot_sends_nothing() {
        let (notifier, messenger) = notifier_with(false, "111", vec![]).await;

        notifier.notify_expiring_soon("vmess-1", 3).await;

        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unattached_notifier_is_a_no_op() {
        let notifier = Notifier::new(
            StaticSettings::new(true, "111"),
            ScriptedPanel::new(vec![]),
        );

        // No gateway has ever been attached; must return quietly.
        notifier.notify_cpu_load(93.125).await;
    }

    #[tokio::test]
    async fn event_templates_carry_their_fields() {
        let (notifier, messenger) = notifier_with(true, "111", vec![]).await;

        notifier.notify_login("admin", "203.0.113.9").await;
        notifier.notify_traffic_limit("vmess-1", 1_048_576).await;
        notifier.notify_expiring_soon("vmess-1", 3).await;
        notifier.notify_cpu_load(91.5).await;

        let texts = messenger.texts_for(111);
        assert_eq!(texts.len(), 4);
        assert!(texts[0].contains("admin") && texts[0].contains("203.0.113.9"));
        assert_eq!(
            texts[1],
            "Inbound vmess-1 has reached traffic limit: 1.00 MB"
        );
        assert_eq!(texts[2], "Inbound vmess-1 will expire in 3 days.");
        assert_eq!(texts[3], "CPU load has exceeded threshold: 91.50%");
    }

    #[tokio::test]
    async fn daily_report_lists_every_inbound_per_recipient() {
        let inbounds = vec![
            InboundSummary {
                tag: "vmess-1".to_string(),
                total: 1_048_576,
            },
            InboundSummary {
                tag: "vless-2".to_string(),
                total: 2048,
            },
        ];
        let (notifier, messenger) = notifier_with(true, "111,222", inbounds).await;

        notifier.send_daily_report().await;

        let texts = messenger.texts_for(111);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Daily Traffic Report:"));
        assert!(texts[0].contains("vmess-1: 1.00 MB"));
        assert!(texts[0].contains("vless-2: 2.00 KB"));
        assert_eq!(messenger.texts_for(222), texts);
    }

    #[tokio::test]
    async fn daily_report_with_failing_service_sends_nothing() {
        let messenger = RecordingMessenger::new();
        let panel = ScriptedPanel::new(vec![]);
        *panel.list_error.lock().unwrap() = Some("db gone".to_string());
        let notifier = Notifier::new(StaticSettings::new(true, "111"), panel);
        notifier.attach(messenger.clone()).await;

        notifier.send_daily_report().await;

        assert!(messenger.sent.lock().unwrap().is_empty());
    }
}
