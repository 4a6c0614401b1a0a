//! Delivery state machine: send, verify, retry.
//!
//! ```text
//! Idle -> AlreadySentCheck -> Sending -> SendFailed -> Retry
//!                                     -> SendOk -> Verifying -> VerifyOk      = Success
//!                                                            -> VerifyMismatch -> Retry
//! Retry -> Sending (while attempts remain) | Failed
//! ```
//!
//! Attempts are bounded: at most `max_verify_retries + 1` sends per contact.
//!
//! CHANGELOG:
//! - 10/16/2026 - Disconnects end the loop instead of retrying
//! - 10/15/2026 - Alias fallback shared with fire-and-forget sends
//! - 10/14/2026 - Initial implementation

pub mod events;
pub mod outcome;

use std::time::Duration;

use crate::contacts::RecipientIdentity;
use crate::error::{DeliveryError, TransportError};
use crate::fallback::BestEffort;
use crate::pacing::with_send_timeout;
use crate::transport::{last_message_from_me, MessageContent, Transport};

pub use events::{
    snippet, ChannelObserver, DeliveryEvent, DeliveryObserver, NoopObserver, ObserverMessage,
    TracingObserver,
};
pub use outcome::DeliveryOutcome;

/// Tuning for a single contact's delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub send_timeout: Duration,
    /// Wait between a successful send and the verification read.
    pub verify_delay: Duration,
    /// Wait before re-sending after a failed attempt.
    pub retry_delay: Duration,
    pub max_verify_retries: u32,
    pub check_already_sent: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(30_000),
            verify_delay: Duration::from_millis(2_000),
            retry_delay: Duration::from_millis(2_000),
            max_verify_retries: 2,
            check_already_sent: true,
        }
    }
}

/// Result of one send+verify attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptResult {
    Success,
    Retry(DeliveryError),
    Failed(DeliveryError),
}

/// Send `message` to `identity` and confirm it landed.
///
/// Never panics or errors: every path ends in a `DeliveryOutcome`.
pub async fn send_and_verify<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
    message: &str,
    options: &DeliveryOptions,
    observer: &dyn DeliveryObserver,
) -> DeliveryOutcome {
    let mut target = identity.clone();

    if options.check_already_sent {
        let last = last_message_from_me(transport, &target)
            .await
            .best_effort("already-sent check")
            .flatten();
        if last.is_some_and(|m| m.body == message) {
            observer.on_step(identity, &DeliveryEvent::AlreadySent);
            tracing::info!(contact = %identity, "identical message already sent, skipping");
            return DeliveryOutcome::already_sent(&target);
        }
    }

    let content = MessageContent::text(message);
    let mut last_error = DeliveryError::NotObserved;
    let mut attempts = 0;

    for attempt in 0..=options.max_verify_retries {
        attempts = attempt + 1;
        let result = attempt_once(
            transport,
            identity,
            &mut target,
            &content,
            message,
            attempt,
            options,
            observer,
        )
        .await;

        match result {
            AttemptResult::Success => {
                observer.on_step(identity, &DeliveryEvent::Verified { attempt });
                tracing::info!(contact = %target, attempt, "delivered and verified");
                return DeliveryOutcome::delivered(&target, attempt);
            }
            AttemptResult::Failed(err) => {
                last_error = err;
                break;
            }
            AttemptResult::Retry(err) => {
                if attempt < options.max_verify_retries {
                    observer.on_step(
                        identity,
                        &DeliveryEvent::Retrying {
                            attempt,
                            reason: err.to_string(),
                        },
                    );
                    tokio::time::sleep(options.retry_delay).await;
                }
                last_error = err;
            }
        }
    }

    let reason = last_error.to_string();
    observer.on_step(
        identity,
        &DeliveryEvent::GaveUp {
            attempts,
            reason: reason.clone(),
        },
    );
    tracing::warn!(contact = %target, attempts, %reason, "delivery failed");
    DeliveryOutcome::failed(target.to_string(), reason, Some(attempts - 1))
}

/// Fire-and-forget send: alias fallback and timeout, no verification.
pub async fn send_once<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
    content: &MessageContent,
    options: &DeliveryOptions,
    observer: &dyn DeliveryObserver,
) -> DeliveryOutcome {
    let mut target = identity.clone();
    observer.on_step(identity, &DeliveryEvent::Sending { attempt: 0 });

    match send_with_alias_fallback(transport, identity, &mut target, content, 0, options, observer).await {
        Ok(()) => {
            observer.on_step(identity, &DeliveryEvent::Sent { attempt: 0 });
            DeliveryOutcome::sent(&target)
        }
        Err(err) => {
            let reason = err.to_string();
            observer.on_step(
                identity,
                &DeliveryEvent::SendFailed {
                    attempt: 0,
                    reason: reason.clone(),
                },
            );
            tracing::warn!(contact = %target, %reason, "send failed");
            DeliveryOutcome::failed(target.to_string(), reason, None)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn attempt_once<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
    target: &mut RecipientIdentity,
    content: &MessageContent,
    message: &str,
    attempt: u32,
    options: &DeliveryOptions,
    observer: &dyn DeliveryObserver,
) -> AttemptResult {
    observer.on_step(identity, &DeliveryEvent::Sending { attempt });

    if let Err(err) =
        send_with_alias_fallback(transport, identity, target, content, attempt, options, observer).await
    {
        observer.on_step(
            identity,
            &DeliveryEvent::SendFailed {
                attempt,
                reason: err.to_string(),
            },
        );
        let fatal = matches!(&err, DeliveryError::SendFailed(e) if e.is_disconnect());
        return if fatal {
            AttemptResult::Failed(err)
        } else {
            AttemptResult::Retry(err)
        };
    }

    observer.on_step(identity, &DeliveryEvent::Verifying { attempt });
    tokio::time::sleep(options.verify_delay).await;

    let observed = last_message_from_me(transport, target)
        .await
        .best_effort("verification read")
        .flatten();

    let err = match observed {
        Some(m) if m.body == message => return AttemptResult::Success,
        Some(m) => DeliveryError::VerificationMismatch {
            observed: snippet(&m.body),
        },
        None => DeliveryError::NotObserved,
    };

    let excerpt = match &err {
        DeliveryError::VerificationMismatch { observed } => Some(observed.clone()),
        _ => None,
    };
    observer.on_step(
        identity,
        &DeliveryEvent::Mismatch {
            attempt,
            reason: err.to_string(),
            snippet: excerpt,
        },
    );
    AttemptResult::Retry(err)
}

/// Send to `target`, switching it to the alias form once if the platform
/// demands it.
async fn send_with_alias_fallback<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
    target: &mut RecipientIdentity,
    content: &MessageContent,
    attempt: u32,
    options: &DeliveryOptions,
    observer: &dyn DeliveryObserver,
) -> Result<(), DeliveryError> {
    let first = with_send_timeout(options.send_timeout, transport.send_message(target, content)).await?;

    match first {
        Ok(()) => Ok(()),
        Err(TransportError::AliasRequired) if target.is_phone_based() => {
            let alias = transport
                .resolve_alias(target)
                .await
                .best_effort("alias fallback lookup")
                .and_then(|lookup| lookup.alias)
                .ok_or_else(|| DeliveryError::AliasUnavailable(format!("no alias known for {}", target)))?;

            observer.on_step(
                identity,
                &DeliveryEvent::AliasFallback {
                    attempt,
                    alias: alias.clone(),
                },
            );
            tracing::debug!(from = %target, to = %alias, "retrying send with alias");

            match with_send_timeout(options.send_timeout, transport.send_message(&alias, content)).await? {
                Ok(()) => {
                    *target = alias;
                    Ok(())
                }
                Err(e) if e.is_disconnect() => Err(DeliveryError::SendFailed(e)),
                Err(e) => Err(DeliveryError::AliasUnavailable(e.to_string())),
            }
        }
        Err(e) => Err(DeliveryError::SendFailed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AliasLookup, ChatMessage, Conversation, FetchOptions};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// What a scripted send does.
    #[derive(Clone)]
    enum SendScript {
        Ok,
        Fail(TransportError),
        Hang,
    }

    /// Transport answering from queues. An empty send queue means `Ok`; an
    /// empty read queue means "nothing from us". The first `read_errors`
    /// reads fail before the read queue is consulted.
    #[derive(Default)]
    struct Scripted {
        sends: Mutex<VecDeque<SendScript>>,
        reads: Mutex<VecDeque<Option<String>>>,
        read_errors: Mutex<usize>,
        alias: Option<RecipientIdentity>,
        send_log: Mutex<Vec<RecipientIdentity>>,
    }

    impl Scripted {
        fn sends(self, script: Vec<SendScript>) -> Self {
            *self.sends.lock().unwrap() = script.into();
            self
        }

        fn reads(self, script: Vec<Option<&str>>) -> Self {
            *self.reads.lock().unwrap() = script.into_iter().map(|r| r.map(str::to_string)).collect();
            self
        }

        fn read_errors(self, count: usize) -> Self {
            *self.read_errors.lock().unwrap() = count;
            self
        }

        fn send_count(&self) -> usize {
            self.send_log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send_message(&self, identity: &RecipientIdentity, _: &MessageContent) -> Result<(), TransportError> {
            self.send_log.lock().unwrap().push(identity.clone());
            let next = self.sends.lock().unwrap().pop_front().unwrap_or(SendScript::Ok);
            match next {
                SendScript::Ok => Ok(()),
                SendScript::Fail(e) => Err(e),
                SendScript::Hang => std::future::pending().await,
            }
        }

        async fn fetch_last_messages(
            &self,
            _: &RecipientIdentity,
            _: FetchOptions,
        ) -> Result<Vec<ChatMessage>, TransportError> {
            {
                let mut errors = self.read_errors.lock().unwrap();
                if *errors > 0 {
                    *errors -= 1;
                    return Err(TransportError::Io("history unavailable".to_string()));
                }
            }
            let next = self.reads.lock().unwrap().pop_front().flatten();
            Ok(next
                .map(|body| {
                    vec![ChatMessage {
                        body,
                        timestamp: Utc::now(),
                        from_me: true,
                    }]
                })
                .unwrap_or_default())
        }

        async fn resolve_alias(&self, _: &RecipientIdentity) -> Result<AliasLookup, TransportError> {
            Ok(AliasLookup {
                alias: self.alias.clone(),
                phone: None,
            })
        }

        async fn resolve_canonical_id(&self, identity: &RecipientIdentity) -> Result<RecipientIdentity, TransportError> {
            Ok(identity.clone())
        }

        async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
            Ok(Vec::new())
        }
    }

    fn id() -> RecipientIdentity {
        RecipientIdentity::new("5547999512346@c.us")
    }

    fn options(max_verify_retries: u32) -> DeliveryOptions {
        DeliveryOptions {
            max_verify_retries,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_sent_short_circuits() {
        let transport = Scripted::default().reads(vec![Some("Olá")]);
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(outcome.success);
        assert!(outcome.already_sent);
        assert_eq!(transport.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_error_does_not_block_send() {
        // already-sent read fails, verification read sees the message
        let transport = Scripted::default().read_errors(1).reads(vec![Some("Olá")]);
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(outcome.success);
        assert!(!outcome.already_sent);
        assert_eq!(outcome.retried, Some(0));
        assert_eq!(transport.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verified_first_try() {
        // already-sent read sees nothing, verification read sees the message
        let transport = Scripted::default().reads(vec![None, Some("Olá")]);
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(outcome.success);
        assert_eq!(outcome.retried, Some(0));
        assert_eq!(transport.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_every_time_is_bounded() {
        let transport = Scripted::default().reads(vec![None, Some("x"), Some("x"), Some("x"), Some("x")]);
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(!outcome.success);
        assert_eq!(transport.send_count(), 3);
        assert!(outcome.error.unwrap().contains("verification mismatch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_one_attempt() {
        let transport = Scripted::default();
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(0), &NoopObserver).await;

        assert!(!outcome.success);
        assert_eq!(transport.send_count(), 1);
        assert_eq!(
            outcome.error.as_deref(),
            Some("verification failed: no message from us found")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_send_times_out_and_retries() {
        let transport = Scripted::default()
            .sends(vec![SendScript::Hang, SendScript::Ok])
            .reads(vec![None, Some("Olá")]);
        let (observer, mut rx) = ChannelObserver::new();
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &observer).await;

        assert!(outcome.success);
        assert_eq!(outcome.retried, Some(1));

        let mut saw_timeout = false;
        while let Ok(ObserverMessage::Step { event, .. }) = rx.try_recv() {
            if let DeliveryEvent::SendFailed { reason, .. } = event {
                saw_timeout |= reason == "send timeout";
            }
        }
        assert!(saw_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alias_fallback_switches_target() {
        let transport = Scripted {
            alias: Some(RecipientIdentity::new("424242@lid")),
            ..Default::default()
        }
        .sends(vec![SendScript::Fail(TransportError::AliasRequired), SendScript::Ok])
        .reads(vec![None, Some("Olá")]);

        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(outcome.success);
        assert_eq!(outcome.contact, "424242@lid");
        assert_eq!(outcome.retried, Some(0));
        let log = transport.send_log.lock().unwrap().clone();
        assert_eq!(log, vec![id(), RecipientIdentity::new("424242@lid")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alias_required_without_alias_fails_attempt() {
        let transport = Scripted::default().sends(vec![SendScript::Fail(TransportError::AliasRequired)]);
        let outcome = send_once(&transport, &id(), &MessageContent::text("Olá"), &options(2), &NoopObserver).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("alias fallback failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_not_retried() {
        let transport = Scripted::default()
            .sends(vec![SendScript::Fail(TransportError::Disconnected("logged out".into()))]);
        let outcome = send_and_verify(&transport, &id(), "Olá", &options(2), &NoopObserver).await;

        assert!(!outcome.success);
        assert_eq!(transport.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_once_does_not_verify() {
        let transport = Scripted::default();
        let outcome = send_once(&transport, &id(), &MessageContent::text("Olá"), &options(2), &NoopObserver).await;

        assert!(outcome.success);
        assert_eq!(outcome.retried, None);
        assert_eq!(transport.send_count(), 1);
    }
}
