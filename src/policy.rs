//! Dedup/skip policy: who should not be messaged again.
//!
//! Exactly one mode applies to a run. History lookups fail open: if the
//! transport cannot tell us what we sent before, we send.
//!
//! CHANGELOG:
//! - 10/14/2026 - Initial implementation

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::contacts::RecipientIdentity;
use crate::fallback::BestEffort;
use crate::transport::{last_message_from_me, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Always send.
    Force,
    /// Only contacts we have never messaged.
    SkipIfEverSent,
    /// At most one outreach per contact per local calendar day.
    SkipIfSentToday,
}

impl SkipPolicy {
    /// `force` wins over everything; otherwise the ever-sent flag picks the mode.
    pub fn from_flags(force: bool, skip_if_ever_sent: bool) -> Self {
        if force {
            SkipPolicy::Force
        } else if skip_if_ever_sent {
            SkipPolicy::SkipIfEverSent
        } else {
            SkipPolicy::SkipIfSentToday
        }
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        SkipPolicy::SkipIfEverSent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDecision {
    Send,
    AlreadyReceived,
    SentToday,
}

/// Decide whether `identity` should be skipped under `policy`.
pub async fn evaluate<T: Transport + ?Sized>(
    policy: SkipPolicy,
    transport: &T,
    identity: &RecipientIdentity,
    now: DateTime<Local>,
) -> SkipDecision {
    if policy == SkipPolicy::Force {
        return SkipDecision::Send;
    }

    let last = last_message_from_me(transport, identity)
        .await
        .best_effort("skip policy history")
        .flatten();
    let Some(last) = last else {
        return SkipDecision::Send;
    };

    match policy {
        SkipPolicy::SkipIfEverSent if !last.body.is_empty() => SkipDecision::AlreadyReceived,
        SkipPolicy::SkipIfSentToday
            if last.timestamp.with_timezone(&Local).date_naive() == now.date_naive() =>
        {
            SkipDecision::SentToday
        }
        _ => SkipDecision::Send,
    }
}
