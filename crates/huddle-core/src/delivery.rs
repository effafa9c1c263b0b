//! Delivery queues for Huddle.
//!
//! Every session owns an [`Outbox`]: the sending half of an unbounded queue
//! drained by the connection's own task. Routing only ever hands lines to
//! outboxes, so a slow or stalled peer cannot hold up a registry or another
//! sender.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// A formatted line, shared across every recipient of a fan-out.
pub type Line = Arc<str>;

/// Receiving half of an outbox, owned by the connection task.
pub type OutboxReceiver = mpsc::UnboundedReceiver<Line>;

/// Create a connected outbox pair.
#[must_use]
pub fn outbox() -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, rx)
}

/// Sending half of a connection's delivery queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Line>,
}

impl Outbox {
    /// Queue a line for delivery.
    ///
    /// Returns `false` if the connection is gone; the line is dropped.
    pub fn deliver(&self, line: Line) -> bool {
        self.tx.send(line).is_ok()
    }

    /// Check whether the receiving connection has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Deliver one line to every recipient.
///
/// Failures are skipped, never retried. Returns the number of recipients the
/// line was handed to.
pub fn fan_out(recipients: &[Outbox], line: impl Into<Line>) -> usize {
    let line = line.into();
    let mut delivered = 0;
    for outbox in recipients {
        if outbox.deliver(Arc::clone(&line)) {
            delivered += 1;
        } else {
            trace!("Skipped delivery to closed outbox");
        }
    }
    delivered
}
