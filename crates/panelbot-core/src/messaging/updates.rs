//! The inbound update sequence.
//!
//! Adapters feed updates into an `UpdateSender`; the ingestion loop consumes
//! the matching `UpdateStream`. The stream is lazy, unbounded and infinite
//! until stopped; once `next` has returned `None` it never yields again.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::messaging::types::IncomingUpdate;

/// Create a connected sender/stream pair.
pub fn update_channel() -> (UpdateSender, UpdateStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    (
        UpdateSender {
            tx,
            token: token.clone(),
        },
        UpdateStream { rx, token },
    )
}

/// Adapter-side half: pushes updates toward the ingestion loop.
#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<IncomingUpdate>,
    token: CancellationToken,
}

impl UpdateSender {
    /// Returns false once the stream has been stopped or dropped.
    pub fn send(&self, update: IncomingUpdate) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.tx.send(update).is_ok()
    }

    /// Resolves when the consumer asks the transport to halt delivery.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Consumer-side half, owned by the ingestion loop.
pub struct UpdateStream {
    rx: mpsc::UnboundedReceiver<IncomingUpdate>,
    token: CancellationToken,
}

impl UpdateStream {
    /// Next inbound update; `None` once stopped or the feed closed.
    pub async fn next(&mut self) -> Option<IncomingUpdate> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            update = self.rx.recv() => update,
        }
    }

    /// Token that halts delivery when cancelled. Held by the bot session so
    /// `stop` can close the stream from outside the loop task.
    pub fn stop_token(&self) -> CancellationToken {
        self.token.clone()
    }
}
