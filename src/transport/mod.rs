//! Transport boundary: everything the delivery engine needs from a
//! messaging session.
//!
//! The engine borrows a single transport for the whole batch and never
//! issues two calls at once. Implementations do not need internal locking
//! for correctness of the batch, only for their own bookkeeping.
//!
//! CHANGELOG:
//! - 10/16/2026 - Added session state for disconnect detection
//! - 10/13/2026 - Initial trait, bridge and dry-run implementations

pub mod bridge;
pub mod dry_run;
pub mod protocol;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contacts::RecipientIdentity;
use crate::error::TransportError;

pub use bridge::BridgeTransport;
pub use dry_run::DryRunTransport;

/// Payload of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text { body: String },
    Media {
        mime_type: String,
        filename: String,
        /// Raw bytes, sent to the bridge as a JSON byte array.
        data: Vec<u8>,
    },
}

impl MessageContent {
    pub fn text(body: impl Into<String>) -> Self {
        MessageContent::Text { body: body.into() }
    }

    /// Text a verification read should expect, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { body } => Some(body),
            MessageContent::Media { .. } => None,
        }
    }
}

/// A message read back from a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub from_me: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub from_me_only: bool,
    pub limit: u32,
}

impl FetchOptions {
    /// Only the most recent message we sent.
    pub const LAST_FROM_ME: FetchOptions = FetchOptions {
        from_me_only: true,
        limit: 1,
    };
}

/// Result of an alias lookup. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasLookup {
    #[serde(default)]
    pub alias: Option<RecipientIdentity>,
    #[serde(default)]
    pub phone: Option<RecipientIdentity>,
}

/// An open conversation known to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub identity: RecipientIdentity,
    /// Phone number recorded for alias-addressed conversations.
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Connected,
    Disconnected(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(
        &self,
        identity: &RecipientIdentity,
        content: &MessageContent,
    ) -> Result<(), TransportError>;

    /// Messages in the conversation, most recent last.
    async fn fetch_last_messages(
        &self,
        identity: &RecipientIdentity,
        options: FetchOptions,
    ) -> Result<Vec<ChatMessage>, TransportError>;

    async fn resolve_alias(&self, identity: &RecipientIdentity) -> Result<AliasLookup, TransportError>;

    async fn resolve_canonical_id(
        &self,
        identity: &RecipientIdentity,
    ) -> Result<RecipientIdentity, TransportError>;

    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError>;

    /// Session health as last observed by the transport.
    fn session_state(&self) -> SessionState {
        SessionState::Connected
    }
}

/// Most recent message we sent to `identity`, if any.
pub async fn last_message_from_me<T: Transport + ?Sized>(
    transport: &T,
    identity: &RecipientIdentity,
) -> Result<Option<ChatMessage>, TransportError> {
    let mut messages = transport
        .fetch_last_messages(identity, FetchOptions::LAST_FROM_ME)
        .await?;
    messages.retain(|m| m.from_me);
    Ok(messages.pop())
}
