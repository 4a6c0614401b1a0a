//! Terminal per-contact result.

use serde::{Deserialize, Serialize};

use crate::contacts::RecipientIdentity;
use crate::policy::SkipDecision;

fn is_false(b: &bool) -> bool {
    !*b
}

/// One per batch item. Serialized in camelCase for the JSON report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// Identity the message went to, or the raw contact if it never parsed.
    pub contact: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Zero-based index of the attempt that settled the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retried: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub already_sent: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped_same_day: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped_already_received: bool,
}

impl DeliveryOutcome {
    /// Sent and verified on attempt `attempt`.
    pub fn delivered(identity: &RecipientIdentity, attempt: u32) -> Self {
        Self {
            contact: identity.to_string(),
            success: true,
            retried: Some(attempt),
            ..Default::default()
        }
    }

    /// Sent without verification.
    pub fn sent(identity: &RecipientIdentity) -> Self {
        Self {
            contact: identity.to_string(),
            success: true,
            ..Default::default()
        }
    }

    pub fn already_sent(identity: &RecipientIdentity) -> Self {
        Self {
            contact: identity.to_string(),
            success: true,
            already_sent: true,
            ..Default::default()
        }
    }

    pub fn skipped(identity: &RecipientIdentity, decision: SkipDecision) -> Self {
        Self {
            contact: identity.to_string(),
            success: true,
            skipped_same_day: decision == SkipDecision::SentToday,
            skipped_already_received: decision == SkipDecision::AlreadyReceived,
            ..Default::default()
        }
    }

    pub fn failed(contact: impl Into<String>, error: impl Into<String>, retried: Option<u32>) -> Self {
        Self {
            contact: contact.into(),
            success: false,
            error: Some(error.into()),
            retried,
            ..Default::default()
        }
    }

    /// True for outcomes that involved no send at all.
    pub fn is_skip(&self) -> bool {
        self.already_sent || self.skipped_same_day || self.skipped_already_received
    }

    /// Short status word for human output.
    pub fn status(&self) -> &'static str {
        if !self.success {
            "failed"
        } else if self.already_sent {
            "already-sent"
        } else if self.skipped_already_received {
            "skipped-received"
        } else if self.skipped_same_day {
            "skipped-today"
        } else {
            "sent"
        }
    }
}
