//! Streaming progress for long-running calls.
//!
//! Each streaming-capable call gets a [`ProgressSender`] bound to the
//! call's progress token. Updates are pushed into the session's single
//! outgoing writer queue, so every update is enqueued before the terminal
//! response of the same call and arrives in emission order.

use futures::channel::mpsc::UnboundedSender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tinymcp_core::protocol::{Message, Notification, ProgressToken};
use tinymcp_core::types::ProgressUpdate;
use tracing::trace;

use crate::router::notifications;

/// Emit handle for progress updates of one call.
///
/// Emission never blocks the handler. Sequence numbers start at zero and
/// increase strictly by one. Once the call's terminal response is queued
/// the sender turns inert and further emits are silently dropped. A call
/// to a tool that never declared streaming gets a disabled sender whose
/// emits go nowhere.
#[derive(Clone)]
pub struct ProgressSender {
    token: ProgressToken,
    sequence: Arc<AtomicU64>,
    terminal: Arc<AtomicBool>,
    enabled: bool,
    outgoing: UnboundedSender<Message>,
}

impl ProgressSender {
    pub(crate) fn new(token: ProgressToken, outgoing: UnboundedSender<Message>) -> Self {
        Self {
            token,
            sequence: Arc::new(AtomicU64::new(0)),
            terminal: Arc::new(AtomicBool::new(false)),
            enabled: true,
            outgoing,
        }
    }

    /// A sender for a tool that never declared streaming.
    pub(crate) fn disabled(token: ProgressToken, outgoing: UnboundedSender<Message>) -> Self {
        Self {
            enabled: false,
            ..Self::new(token, outgoing)
        }
    }

    /// The token this sender emits under.
    #[must_use]
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Emit one progress update.
    ///
    /// Dropped silently once the call has completed or the session's
    /// writer has gone away.
    pub fn emit(&self, progress: u64, total: Option<u64>, message: Option<&str>) {
        if !self.enabled {
            trace!(token = %self.token, "Dropping progress from a tool without a streaming declaration");
            return;
        }
        if self.terminal.load(Ordering::SeqCst) {
            trace!(token = %self.token, "Dropping progress emitted after terminal response");
            return;
        }

        let update = ProgressUpdate {
            token: self.token.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            progress,
            total,
            message: message.map(String::from),
        };

        let Ok(params) = serde_json::to_value(&update) else {
            return;
        };
        let notification = Notification::with_params(notifications::PROGRESS, params);
        // Unbounded send only fails when the writer is gone, which means
        // the session is tearing down anyway.
        let _ = self
            .outgoing
            .unbounded_send(Message::Notification(notification));
    }

    /// Mark the call complete. Emits after this point are dropped.
    pub(crate) fn finish(&self) {
        self.terminal.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender")
            .field("token", &self.token)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .field("terminal", &self.terminal.load(Ordering::SeqCst))
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_updates(
        rx: &mut futures::channel::mpsc::UnboundedReceiver<Message>,
    ) -> Vec<ProgressUpdate> {
        let mut updates = Vec::new();
        while let Ok(Some(msg)) = rx.try_next() {
            if let Message::Notification(n) = msg {
                assert_eq!(n.method.as_ref(), notifications::PROGRESS);
                updates.push(serde_json::from_value(n.params.unwrap()).unwrap());
            }
        }
        updates
    }

    #[test]
    fn sequences_are_gap_free_from_zero() {
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        let sender = ProgressSender::new(ProgressToken::Number(1), tx);

        for step in 0..4u64 {
            sender.emit(step, Some(3), None);
        }
        drop(sender);

        let updates = collect_updates(&mut rx);
        let sequences: Vec<_> = updates.iter().map(|u| u.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[test]
    fn emits_after_finish_are_dropped() {
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        let sender = ProgressSender::new(ProgressToken::Number(1), tx);

        sender.emit(1, Some(2), Some("half"));
        sender.finish();
        sender.emit(2, Some(2), Some("late"));
        drop(sender);

        let updates = collect_updates(&mut rx);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].message.as_deref(), Some("half"));
    }

    #[test]
    fn disabled_sender_emits_nothing() {
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        let sender = ProgressSender::disabled(ProgressToken::Number(1), tx);

        sender.emit(0, Some(1), Some("never seen"));
        drop(sender);

        assert!(collect_updates(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn emit_survives_a_dropped_writer() {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        drop(rx);
        let sender = ProgressSender::new(ProgressToken::Number(1), tx);
        sender.emit(0, None, None);
    }
}
