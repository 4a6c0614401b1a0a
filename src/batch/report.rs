//! Aggregate batch result.

use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryOutcome;
use crate::error::BatchError;

/// `sent + failed == results.len()`. Skips and already-sent outcomes count as
/// `sent` and are also tallied in `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub sent: usize,
    pub failed: usize,
    #[serde(default)]
    pub skipped: usize,
    pub results: Vec<DeliveryOutcome>,
    /// Set when the session dropped before every item was processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected: Option<String>,
}

impl BatchReport {
    pub fn with_capacity(items: usize) -> Self {
        Self {
            results: Vec::with_capacity(items),
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: DeliveryOutcome) {
        if outcome.success {
            self.sent += 1;
            if outcome.is_skip() {
                self.skipped += 1;
            }
        } else {
            self.failed += 1;
        }
        self.results.push(outcome);
    }

    /// Outcomes that required an actual send.
    pub fn delivered(&self) -> usize {
        self.sent - self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Mark the report as cut short and turn it into the batch error.
    pub fn into_disconnected(mut self, reason: String, total: usize) -> BatchError {
        self.disconnected = Some(reason.clone());
        BatchError::Disconnected {
            reason,
            total,
            report: self,
        }
    }
}
