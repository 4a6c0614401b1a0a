//! Step and progress notifications.
//!
//! The engine only talks to a `DeliveryObserver`; where the notifications end
//! up (log, terminal, channel) is the caller's business.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::contacts::RecipientIdentity;

/// Longest mismatched-text excerpt carried by an event.
pub const SNIPPET_CHARS: usize = 60;

/// One transition of the delivery state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DeliveryEvent {
    AlreadySent,
    Sending { attempt: u32 },
    SendFailed { attempt: u32, reason: String },
    AliasFallback { attempt: u32, alias: RecipientIdentity },
    /// Fire-and-forget send settled.
    Sent { attempt: u32 },
    Verifying { attempt: u32 },
    Verified { attempt: u32 },
    Mismatch {
        attempt: u32,
        reason: String,
        snippet: Option<String>,
    },
    Retrying { attempt: u32, reason: String },
    GaveUp { attempts: u32, reason: String },
}

/// Receives engine notifications. All methods default to no-ops.
pub trait DeliveryObserver: Send + Sync {
    fn on_step(&self, _contact: &RecipientIdentity, _event: &DeliveryEvent) {}

    /// `current` is one-based.
    fn on_progress(&self, _current: usize, _total: usize, _contact: &RecipientIdentity) {}
}

/// Drops every notification.
pub struct NoopObserver;

impl DeliveryObserver for NoopObserver {}

/// Writes notifications to the tracing subscriber.
pub struct TracingObserver;

impl DeliveryObserver for TracingObserver {
    fn on_step(&self, contact: &RecipientIdentity, event: &DeliveryEvent) {
        match event {
            DeliveryEvent::SendFailed { .. }
            | DeliveryEvent::Mismatch { .. }
            | DeliveryEvent::GaveUp { .. } => {
                tracing::warn!(contact = %contact, ?event, "delivery step")
            }
            _ => tracing::debug!(contact = %contact, ?event, "delivery step"),
        }
    }

    fn on_progress(&self, current: usize, total: usize, contact: &RecipientIdentity) {
        tracing::info!(current, total, contact = %contact, "batch progress");
    }
}

/// Notification forwarded through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverMessage {
    Step {
        contact: RecipientIdentity,
        event: DeliveryEvent,
    },
    Progress {
        current: usize,
        total: usize,
        contact: RecipientIdentity,
    },
}

/// Forwards notifications to an unbounded tokio channel.
///
/// A closed receiver is ignored; delivery never depends on a listener.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ObserverMessage>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DeliveryObserver for ChannelObserver {
    fn on_step(&self, contact: &RecipientIdentity, event: &DeliveryEvent) {
        let _ = self.tx.send(ObserverMessage::Step {
            contact: contact.clone(),
            event: event.clone(),
        });
    }

    fn on_progress(&self, current: usize, total: usize, contact: &RecipientIdentity) {
        let _ = self.tx.send(ObserverMessage::Progress {
            current,
            total,
            contact: contact.clone(),
        });
    }
}

/// First `SNIPPET_CHARS` characters of `text`, with an ellipsis if cut.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
