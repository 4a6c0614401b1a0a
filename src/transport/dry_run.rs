//! In-memory transport for rehearsing a batch without a session.
//!
//! Sends are recorded and echoed into the conversation history so the
//! verification step sees them, which lets a batch file be exercised end to
//! end from the CLI with `--dry-run`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AliasLookup, ChatMessage, Conversation, FetchOptions, MessageContent, Transport};
use crate::contacts::RecipientIdentity;
use crate::error::TransportError;

#[derive(Default)]
pub struct DryRunTransport {
    history: Mutex<HashMap<RecipientIdentity, Vec<ChatMessage>>>,
    sent: Mutex<Vec<(RecipientIdentity, MessageContent)>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation with a message we sent earlier.
    pub fn with_history(self, identity: RecipientIdentity, message: ChatMessage) -> Self {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(identity)
            .or_default()
            .push(message);
        self
    }

    /// Every send performed so far, in order.
    pub fn sent(&self) -> Vec<(RecipientIdentity, MessageContent)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn send_message(
        &self,
        identity: &RecipientIdentity,
        content: &MessageContent,
    ) -> Result<(), TransportError> {
        tracing::info!(to = %identity, "dry run: message not sent");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((identity.clone(), content.clone()));

        let body = match content {
            MessageContent::Text { body } => body.clone(),
            MessageContent::Media { filename, .. } => format!("[media: {}]", filename),
        };
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(identity.clone())
            .or_default()
            .push(ChatMessage {
                body,
                timestamp: Utc::now(),
                from_me: true,
            });
        Ok(())
    }

    async fn fetch_last_messages(
        &self,
        identity: &RecipientIdentity,
        options: FetchOptions,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let messages: Vec<ChatMessage> = history
            .get(identity)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| !options.from_me_only || m.from_me)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let skip = messages.len().saturating_sub(options.limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn resolve_alias(&self, identity: &RecipientIdentity) -> Result<AliasLookup, TransportError> {
        Ok(AliasLookup {
            alias: None,
            phone: Some(identity.clone()),
        })
    }

    async fn resolve_canonical_id(
        &self,
        identity: &RecipientIdentity,
    ) -> Result<RecipientIdentity, TransportError> {
        Ok(identity.clone())
    }

    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        Ok(history
            .keys()
            .map(|identity| Conversation {
                identity: identity.clone(),
                phone: None,
            })
            .collect())
    }
}
