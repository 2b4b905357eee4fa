//! Standalone runner for the panel admin bot.
//!
//! Wires environment settings, the snapshot-backed panel services and the
//! Telegram transport into a single bot session, then runs until SIGINT.

mod panel;

use std::sync::Arc;

use panelbot_core::{bot::Bot, settings::EnvSettings};
use panelbot_telegram::TelegramConnector;

use crate::panel::StandalonePanel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panelbot_core::logging::init("panelbot")?;

    let settings = Arc::new(EnvSettings::load());
    let panel = Arc::new(StandalonePanel::from_env());

    let bot = Bot::new(
        settings,
        panel.clone(),
        panel.clone(),
        panel,
        Arc::new(TelegramConnector),
    );

    bot.start().await?;
    if !bot.is_running() {
        // Disabled in settings; nothing to wait for.
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    bot.stop().await;

    Ok(())
}
