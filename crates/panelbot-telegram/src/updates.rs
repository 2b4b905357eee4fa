//! Bridges teloxide updates into the core update stream.

use std::time::Duration;

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{CallbackQuery, Message},
    update_listeners::Polling,
};

use panelbot_core::{
    domain::ChatId,
    messaging::{
        types::{CallbackQuery as CallbackSelection, IncomingUpdate, TextMessage},
        updates::{update_channel, UpdateSender, UpdateStream},
    },
};

/// Long-poll window of the update listener.
const POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Spawn a dispatcher that forwards messages and callback selections into
/// the returned stream. Cancelling the stream's stop token shuts the
/// dispatcher down; the stream is not restartable once closed.
pub(crate) fn spawn_update_feed(bot: Bot) -> UpdateStream {
    let (tx, stream) = update_channel();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback_query));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![tx.clone()])
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        let listener = Polling::builder(bot).timeout(POLL_TIMEOUT).build();
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("update listener error"),
            )
            .await;
    });

    // Halt delivery when the consumer stops the stream.
    tokio::spawn(async move {
        tx.stopped().await;
        if let Ok(done) = shutdown.shutdown() {
            done.await;
        }
    });

    stream
}

async fn on_message(msg: Message, tx: UpdateSender) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        tx.send(IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(msg.chat.id.0),
            text: text.to_string(),
        }));
    }
    Ok(())
}

async fn on_callback_query(q: CallbackQuery, tx: UpdateSender) -> ResponseResult<()> {
    // Callbacks detached from a chat cannot be routed or answered usefully.
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat.id.0) else {
        return Ok(());
    };

    tx.send(IncomingUpdate::Callback(CallbackSelection {
        chat_id: ChatId(chat_id),
        callback_id: q.id,
        data: q.data.unwrap_or_default(),
    }));
    Ok(())
}
