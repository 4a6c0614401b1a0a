//! Batch orchestrator: drives a list of (contact, message) items one at a time.
//!
//! Items are never processed concurrently. The transport is a single
//! authenticated session, and a browser-backed session cannot navigate two
//! conversations at once.
//!
//! Per item, in order:
//! 1. Canonical identity (invalid contacts fail here, before any transport call)
//! 2. Media attachment read, if any (unreadable files fail here too)
//! 3. Transport identity resolution
//! 4. Pacing pause
//! 5. Skip policy
//! 6. Verified send, or fire-and-forget when verification is disabled.
//!    Media is always fire-and-forget: read-back only compares text.
//!
//! CHANGELOG:
//! - 10/18/2026 - Media items; disconnect marker on partial reports
//! - 10/16/2026 - Disconnects end the batch with a partial report
//! - 10/14/2026 - Initial implementation

pub mod input;
pub mod report;

use chrono::Local;
use tracing::Instrument;

use crate::contacts::{resolve_transport_identity, CountryPlan, RecipientIdentity};
use crate::delivery::{
    send_and_verify, send_once, DeliveryObserver, DeliveryOptions, DeliveryOutcome, NoopObserver,
};
use crate::error::BatchError;
use crate::pacing::Pacer;
use crate::policy::{self, SkipDecision, SkipPolicy};
use crate::transport::{MessageContent, SessionState, Transport};

pub use input::{load_items, parse_items, BatchItem, MediaAttachment};
pub use report::BatchReport;

static NOOP: NoopObserver = NoopObserver;

/// Everything that shapes a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub pacer: Pacer,
    pub delivery: DeliveryOptions,
    /// Fire-and-forget sends, no verification or retry.
    pub skip_verify: bool,
    pub skip_policy: SkipPolicy,
    pub country: CountryPlan,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pacer: Pacer::new(4_000, 12_000),
            delivery: DeliveryOptions::default(),
            skip_verify: false,
            skip_policy: SkipPolicy::default(),
            country: CountryPlan::default(),
        }
    }
}

/// Runs batches against one borrowed transport.
pub struct BatchRunner<'a, T: Transport + ?Sized> {
    transport: &'a T,
    options: BatchOptions,
    observer: &'a dyn DeliveryObserver,
}

impl<'a, T: Transport + ?Sized> BatchRunner<'a, T> {
    pub fn new(transport: &'a T, options: BatchOptions) -> Self {
        Self {
            transport,
            options,
            observer: &NOOP,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn DeliveryObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Process every item in order.
    ///
    /// Per-item failures end up in the report. The only error is a session
    /// disconnect, which carries the outcomes produced before it.
    pub async fn run(&self, items: &[BatchItem]) -> Result<BatchReport, BatchError> {
        let total = items.len();
        let mut report = BatchReport::with_capacity(total);
        tracing::info!(total, policy = ?self.options.skip_policy, skip_verify = self.options.skip_verify, "batch started");

        for (index, item) in items.iter().enumerate() {
            if let SessionState::Disconnected(reason) = self.transport.session_state() {
                return Err(report.into_disconnected(reason, total));
            }

            let span = tracing::info_span!("item", index = index + 1, total);
            let (contact, outcome) = self.process(item).instrument(span).await;
            report.record(outcome);
            self.observer.on_progress(index + 1, total, &contact);
        }

        if let SessionState::Disconnected(reason) = self.transport.session_state() {
            return Err(report.into_disconnected(reason, total));
        }

        tracing::info!(sent = report.sent, failed = report.failed, skipped = report.skipped, "batch finished");
        Ok(report)
    }

    async fn process(&self, item: &BatchItem) -> (RecipientIdentity, DeliveryOutcome) {
        let canonical = match self.options.country.to_canonical_identity(&item.contact) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(contact = %item.contact, error = %e, "invalid contact");
                return (
                    RecipientIdentity::new(item.contact.trim()),
                    DeliveryOutcome::failed(item.contact.clone(), e.to_string(), None),
                );
            }
        };

        let media = match &item.media {
            Some(attachment) => match attachment.load().await {
                Ok(content) => Some(content),
                Err(e) => {
                    tracing::warn!(contact = %canonical, error = %e, "media unreadable");
                    let outcome = DeliveryOutcome::failed(canonical.to_string(), e.to_string(), None);
                    return (canonical, outcome);
                }
            },
            None => None,
        };

        let resolution = resolve_transport_identity(self.transport, &canonical).await;
        let identity = resolution.identity;
        tracing::debug!(contact = %identity, source = ?resolution.source, "identity resolved");

        self.options.pacer.pause().await;

        let decision = policy::evaluate(self.options.skip_policy, self.transport, &identity, Local::now()).await;
        if decision != SkipDecision::Send {
            tracing::info!(contact = %identity, ?decision, "skipped by policy");
            let outcome = DeliveryOutcome::skipped(&identity, decision);
            return (identity, outcome);
        }

        let outcome = if let Some(content) = media {
            send_once(self.transport, &identity, &content, &self.options.delivery, self.observer).await
        } else if self.options.skip_verify {
            send_once(
                self.transport,
                &identity,
                &MessageContent::text(item.message.as_str()),
                &self.options.delivery,
                self.observer,
            )
            .await
        } else {
            send_and_verify(
                self.transport,
                &identity,
                &item.message,
                &self.options.delivery,
                self.observer,
            )
            .await
        };
        (identity, outcome)
    }
}
