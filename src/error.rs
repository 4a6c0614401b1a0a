//! Error types shared across the delivery engine.
//!
//! Per-item failures never leave the batch loop as errors: they are rendered
//! into a `DeliveryOutcome` via their `Display` text. Only `BatchError`
//! escapes the orchestrator.
//!
//! CHANGELOG:
//! - 10/14/2026 - Split transport errors from delivery errors
//! - 10/12/2026 - Initial taxonomy

use thiserror::Error;

use crate::batch::BatchReport;

/// Contact strings that cannot be turned into a recipient identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid contact '{0}': no digits to address")]
    InvalidContact(String),
}

/// Errors reported by a transport implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Recipient must be addressed by its alias id, not the phone form.
    #[error("recipient requires alias addressing")]
    AliasRequired,

    /// Session is gone; nothing else in the batch can succeed.
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// Platform refused the operation.
    #[error("transport rejected request: {0}")]
    Rejected(String),

    /// Malformed exchange with the session bridge.
    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("bridge I/O error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, TransportError::Disconnected(_))
    }
}

/// Why a single delivery attempt did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("send timeout")]
    SendTimeout,

    #[error("send failed: {0}")]
    SendFailed(TransportError),

    /// Alias-required rejection that the alias form could not recover.
    #[error("alias fallback failed: {0}")]
    AliasUnavailable(String),

    #[error("verification mismatch: last sent message was {observed:?}")]
    VerificationMismatch { observed: String },

    #[error("verification failed: no message from us found")]
    NotObserved,
}

/// Errors that end a batch run.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Session dropped mid-batch. Carries the outcomes produced so far.
    #[error("transport disconnected after {} of {total} items: {reason}", .report.results.len())]
    Disconnected {
        reason: String,
        total: usize,
        report: BatchReport,
    },

    #[error("invalid batch input: {0}")]
    Input(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_label() {
        assert_eq!(DeliveryError::SendTimeout.to_string(), "send timeout");
    }

    #[test]
    fn test_disconnect_detection() {
        assert!(TransportError::Disconnected("socket closed".into()).is_disconnect());
        assert!(!TransportError::AliasRequired.is_disconnect());
    }

    #[test]
    fn test_disconnected_batch_message() {
        let err = BatchError::Disconnected {
            reason: "socket closed".into(),
            total: 5,
            report: BatchReport::default(),
        };
        assert_eq!(
            err.to_string(),
            "transport disconnected after 0 of 5 items: socket closed"
        );
    }
}
