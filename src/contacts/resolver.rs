//! Transport-side identity resolution.
//!
//! Some recipients can only be reached through their alias id. Resolution
//! tries progressively more expensive lookups and always degrades to the
//! identity it was given.
//!
//! Order of resolution:
//! 1. Existing conversation whose identity or stored phone matches the digits
//! 2. Alias/phone lookup (alias preferred)
//! 3. Canonical id lookup
//! 4. Original identity
//!
//! CHANGELOG:
//! - 10/13/2026 - Initial implementation

use serde::Serialize;

use super::identity::{normalize_digits, RecipientIdentity};
use crate::fallback::BestEffort;
use crate::transport::Transport;

/// Which lookup produced the resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Conversation,
    Alias,
    PhoneLookup,
    CanonicalId,
    Original,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub identity: RecipientIdentity,
    pub source: ResolutionSource,
}

impl Resolution {
    fn new(identity: RecipientIdentity, source: ResolutionSource) -> Self {
        Self { identity, source }
    }
}

/// Resolve the identity the transport actually wants for `identity`.
///
/// Never fails; every lookup error is logged and skipped.
pub async fn resolve_transport_identity<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
) -> Resolution {
    let target = identity.digits();

    if !target.is_empty() {
        let conversations = transport
            .list_active_conversations()
            .await
            .or_default_logged("list_active_conversations");
        let existing = conversations.into_iter().find(|c| {
            c.identity.digits() == target
                || c.phone.as_deref().map(normalize_digits).as_deref() == Some(target.as_str())
        });
        if let Some(conversation) = existing {
            tracing::debug!(from = %identity, to = %conversation.identity, "resolved via conversation");
            return Resolution::new(conversation.identity, ResolutionSource::Conversation);
        }
    }

    if let Some(lookup) = transport.resolve_alias(identity).await.best_effort("resolve_alias") {
        if let Some(alias) = lookup.alias {
            tracing::debug!(from = %identity, to = %alias, "resolved via alias lookup");
            return Resolution::new(alias, ResolutionSource::Alias);
        }
        if let Some(phone) = lookup.phone {
            return Resolution::new(phone, ResolutionSource::PhoneLookup);
        }
    }

    if let Some(canonical) = transport
        .resolve_canonical_id(identity)
        .await
        .best_effort("resolve_canonical_id")
    {
        return Resolution::new(canonical, ResolutionSource::CanonicalId);
    }

    Resolution::new(identity.clone(), ResolutionSource::Original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::{AliasLookup, ChatMessage, Conversation, FetchOptions, MessageContent};
    use async_trait::async_trait;

    /// Transport whose lookups are fixed up front; `None` means the call errors.
    #[derive(Default)]
    struct LookupStub {
        conversations: Option<Vec<Conversation>>,
        alias: Option<AliasLookup>,
        canonical: Option<RecipientIdentity>,
    }

    fn unavailable() -> TransportError {
        TransportError::Rejected("lookup unavailable".to_string())
    }

    #[async_trait]
    impl Transport for LookupStub {
        async fn send_message(&self, _: &RecipientIdentity, _: &MessageContent) -> Result<(), TransportError> {
            Ok(())
        }

        async fn fetch_last_messages(
            &self,
            _: &RecipientIdentity,
            _: FetchOptions,
        ) -> Result<Vec<ChatMessage>, TransportError> {
            Ok(Vec::new())
        }

        async fn resolve_alias(&self, _: &RecipientIdentity) -> Result<AliasLookup, TransportError> {
            self.alias.clone().ok_or_else(unavailable)
        }

        async fn resolve_canonical_id(&self, _: &RecipientIdentity) -> Result<RecipientIdentity, TransportError> {
            self.canonical.clone().ok_or_else(unavailable)
        }

        async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
            self.conversations.clone().ok_or_else(unavailable)
        }
    }

    fn phone() -> RecipientIdentity {
        RecipientIdentity::new("5547999512346@c.us")
    }

    #[tokio::test]
    async fn test_existing_conversation_wins() {
        let stub = LookupStub {
            conversations: Some(vec![
                Conversation {
                    identity: RecipientIdentity::new("5511988887777@c.us"),
                    phone: None,
                },
                Conversation {
                    identity: RecipientIdentity::new("98765@lid"),
                    phone: Some("+55 47 99951-2346".to_string()),
                },
            ]),
            alias: Some(AliasLookup {
                alias: Some(RecipientIdentity::new("11111@lid")),
                phone: None,
            }),
            ..Default::default()
        };

        let resolution = resolve_transport_identity(&stub, &phone()).await;
        assert_eq!(resolution.identity.as_str(), "98765@lid");
        assert_eq!(resolution.source, ResolutionSource::Conversation);
    }

    #[tokio::test]
    async fn test_alias_preferred_over_phone() {
        let stub = LookupStub {
            conversations: Some(Vec::new()),
            alias: Some(AliasLookup {
                alias: Some(RecipientIdentity::new("11111@lid")),
                phone: Some(phone()),
            }),
            ..Default::default()
        };

        let resolution = resolve_transport_identity(&stub, &phone()).await;
        assert_eq!(resolution.identity.as_str(), "11111@lid");
        assert_eq!(resolution.source, ResolutionSource::Alias);
    }

    #[tokio::test]
    async fn test_phone_form_when_no_alias() {
        let stub = LookupStub {
            alias: Some(AliasLookup {
                alias: None,
                phone: Some(phone()),
            }),
            ..Default::default()
        };

        let resolution = resolve_transport_identity(&stub, &phone()).await;
        assert_eq!(resolution.source, ResolutionSource::PhoneLookup);
    }

    #[tokio::test]
    async fn test_errors_fall_through_to_canonical_id() {
        let stub = LookupStub {
            canonical: Some(RecipientIdentity::new("5547999512346@c.us")),
            ..Default::default()
        };

        let resolution = resolve_transport_identity(&stub, &phone()).await;
        assert_eq!(resolution.source, ResolutionSource::CanonicalId);
    }

    #[tokio::test]
    async fn test_everything_failing_keeps_original() {
        let stub = LookupStub::default();
        let resolution = resolve_transport_identity(&stub, &phone()).await;
        assert_eq!(resolution.identity, phone());
        assert_eq!(resolution.source, ResolutionSource::Original);
    }
}
