//! Bot session lifecycle and the update ingestion loop.
//!
//! One `Bot` exists per process; the owning application constructs it
//! explicitly and keeps the single instance. `start` and `stop` are
//! idempotent and safe to call from outside the loop task. Stopping is
//! cooperative and best-effort: the stop flag is polled once per loop
//! iteration and handlers already dispatched are never cancelled.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    messaging::{
        port::{MessagingConnector, MessagingPort},
        types::IncomingUpdate,
        updates::UpdateStream,
    },
    notify::Notifier,
    ports::{InboundService, ServerControl, SystemMonitor},
    router::{Router, COMMAND_MENU},
    scheduler::ReportScheduler,
    settings::SettingsPort,
    Result,
};

pub struct Bot {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Arc<dyn SettingsPort>,
    inbounds: Arc<dyn InboundService>,
    server: Arc<dyn ServerControl>,
    monitor: Arc<dyn SystemMonitor>,
    connector: Arc<dyn MessagingConnector>,
    notifier: Arc<Notifier>,
    scheduler: ReportScheduler,
    running: AtomicBool,
    stopping: AtomicBool,
    stream_stop: tokio::sync::Mutex<Option<CancellationToken>>,
    loop_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Bot {
    pub fn new(
        settings: Arc<dyn SettingsPort>,
        inbounds: Arc<dyn InboundService>,
        server: Arc<dyn ServerControl>,
        monitor: Arc<dyn SystemMonitor>,
        connector: Arc<dyn MessagingConnector>,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(settings.clone(), inbounds.clone()));
        Self {
            inner: Arc::new(Inner {
                settings,
                inbounds,
                server,
                monitor,
                connector,
                notifier,
                scheduler: ReportScheduler::new(),
                running: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                stream_stop: tokio::sync::Mutex::new(None),
                loop_task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Entry point for the rest of the panel to emit alerts.
    pub fn notifier(&self) -> Arc<Notifier> {
        self.inner.notifier.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Connect, register the command menu, launch the scheduler and the
    /// dedicated ingestion-loop task. A no-op while already running; returns
    /// immediately when the bot is disabled in settings. A rejected token is
    /// the only fatal error.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if !inner.settings.bot_enabled() {
            info!("bot is disabled in settings");
            inner.running.store(false, Ordering::SeqCst);
            return Ok(());
        }

        let token = inner.settings.bot_token();
        let gateway = match inner.connector.connect(&token).await {
            Ok(g) => g,
            Err(e) => {
                inner.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        info!("bot connected");

        inner.stopping.store(false, Ordering::SeqCst);
        inner.notifier.attach(gateway.messenger.clone()).await;

        if let Err(e) = gateway.messenger.set_my_commands(&COMMAND_MENU).await {
            warn!("failed to register the command menu: {e}");
        }

        let schedule = inner.settings.report_schedule();
        if let Err(e) = inner
            .scheduler
            .start(&schedule, inner.notifier.clone())
            .await
        {
            error!("failed to start the report scheduler: {e}");
        }

        let router = Router::new(
            inner.settings.clone(),
            gateway.messenger.clone(),
            inner.inbounds.clone(),
            inner.server.clone(),
            inner.monitor.clone(),
        );

        *inner.stream_stop.lock().await = Some(gateway.updates.stop_token());
        let task = tokio::spawn(run_update_loop(inner.clone(), router, gateway.updates));
        *inner.loop_task.lock().await = Some(task);

        Ok(())
    }

    /// Halt update delivery and the scheduler. Idempotent, callable from any
    /// state; a later `start` builds a fresh gateway and stream.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.stopping.store(true, Ordering::SeqCst);

        if let Some(token) = inner.stream_stop.lock().await.take() {
            token.cancel();
        }
        inner.scheduler.stop().await;
        let _ = inner.loop_task.lock().await.take();

        inner.running.store(false, Ordering::SeqCst);
        info!("bot stopped");
    }
}

/// The dedicated control loop: block on the next update, honor the stop flag
/// once per iteration, and hand each update to its own task so one slow chat
/// never delays another. No ordering is guaranteed across dispatched
/// handlers.
async fn run_update_loop(inner: Arc<Inner>, router: Router, mut updates: UpdateStream) {
    info!("update loop started");
    while let Some(update) = updates.next().await {
        if inner.stopping.load(Ordering::SeqCst) {
            break;
        }
        match update {
            IncomingUpdate::Text(msg) => {
                let router = router.clone();
                tokio::spawn(async move { router.handle_text(msg).await });
            }
            IncomingUpdate::Callback(cb) => {
                let router = router.clone();
                tokio::spawn(async move { router.handle_callback(cb).await });
            }
        }
    }
    info!("update loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::ChatId;
    use crate::messaging::port::Gateway;
    use crate::messaging::types::TextMessage;
    use crate::messaging::updates::{update_channel, UpdateSender};
    use crate::testutil::{RecordingMessenger, ScriptedPanel, StaticSettings};
    use crate::Error;

    struct TestConnector {
        messenger: Arc<RecordingMessenger>,
        feeds: Mutex<Vec<UpdateSender>>,
        connects: AtomicUsize,
        reject_token: bool,
    }

    impl TestConnector {
        fn new(messenger: Arc<RecordingMessenger>) -> Arc<Self> {
            Arc::new(Self {
                messenger,
                feeds: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
                reject_token: false,
            })
        }

        fn latest_feed(&self) -> UpdateSender {
            self.feeds.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingConnector for TestConnector {
        async fn connect(&self, _token: &str) -> Result<Gateway> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.reject_token {
                return Err(Error::Auth("bad token".to_string()));
            }
            let (tx, stream) = update_channel();
            self.feeds.lock().unwrap().push(tx);
            Ok(Gateway {
                messenger: self.messenger.clone(),
                updates: stream,
            })
        }
    }

    fn bot_with(
        settings: Arc<StaticSettings>,
        connector: Arc<TestConnector>,
    ) -> Bot {
        let panel = ScriptedPanel::new(vec![]);
        Bot::new(settings, panel.clone(), panel.clone(), panel, connector)
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cond()
    }

    #[tokio::test]
    async fn stop_before_start_is_safe_and_a_fresh_start_works() {
        let messenger = RecordingMessenger::new();
        let connector = TestConnector::new(messenger);
        let bot = bot_with(StaticSettings::new(true, "111"), connector.clone());

        bot.stop().await;
        bot.stop().await;
        assert!(!bot.is_running());

        bot.start().await.unwrap();
        assert!(bot.is_running());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        bot.stop().await;
    }

    #[tokio::test]
    async fn disabled_bot_stays_idle_without_connecting() {
        let messenger = RecordingMessenger::new();
        let connector = TestConnector::new(messenger);
        let bot = bot_with(StaticSettings::new(false, "111"), connector.clone());

        bot.start().await.unwrap();

        assert!(!bot.is_running());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_is_a_no_op_while_running() {
        let messenger = RecordingMessenger::new();
        let connector = TestConnector::new(messenger);
        let bot = bot_with(StaticSettings::new(true, "111"), connector.clone());

        bot.start().await.unwrap();
        bot.start().await.unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        bot.stop().await;
    }

    #[tokio::test]
    async fn rejected_token_is_fatal_and_leaves_the_bot_stopped() {
        let messenger = RecordingMessenger::new();
        let mut connector = TestConnector::new(messenger);
        Arc::get_mut(&mut connector).unwrap().reject_token = true;
        let bot = bot_with(StaticSettings::new(true, "111"), connector.clone());

        let err = bot.start().await;
        assert!(matches!(err, Err(Error::Auth(_))));
        assert!(!bot.is_running());

        // A later attempt is a fresh start, not a locked-out session.
        let err = bot.start().await;
        assert!(matches!(err, Err(Error::Auth(_))));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn updates_are_dispatched_and_stop_closes_the_feed() {
        let messenger = RecordingMessenger::new();
        let connector = TestConnector::new(messenger.clone());
        let bot = bot_with(StaticSettings::new(true, "111"), connector.clone());

        bot.start().await.unwrap();
        assert_eq!(messenger.command_menus.load(Ordering::SeqCst), 1);

        let feed = connector.latest_feed();
        assert!(feed.send(crate::messaging::types::IncomingUpdate::Text(
            TextMessage {
                chat_id: ChatId(111),
                text: "/start".to_string(),
            }
        )));

        let messenger_poll = messenger.clone();
        assert!(wait_for(move || !messenger_poll.texts_for(111).is_empty()).await);
        assert!(messenger.texts_for(111)[0].contains("/menu"));

        bot.stop().await;
        assert!(feed.is_stopped());
        assert!(!feed.send(crate::messaging::types::IncomingUpdate::Text(
            TextMessage {
                chat_id: ChatId(111),
                text: "/menu".to_string(),
            }
        )));
    }

    #[tokio::test]
    async fn restart_after_stop_builds_a_fresh_gateway() {
        let messenger = RecordingMessenger::new();
        let connector = TestConnector::new(messenger.clone());
        let bot = bot_with(StaticSettings::new(true, "111"), connector.clone());

        bot.start().await.unwrap();
        bot.stop().await;
        bot.start().await.unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert!(bot.is_running());

        let feed = connector.latest_feed();
        assert!(feed.send(crate::messaging::types::IncomingUpdate::Text(
            TextMessage {
                chat_id: ChatId(111),
                text: "/bogus".to_string(),
            }
        )));
        let messenger_poll = messenger.clone();
        assert!(wait_for(move || !messenger_poll.texts_for(111).is_empty()).await);

        bot.stop().await;
    }
}
