//! Scripted in-memory transport for batch tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use wolfies_broadcast::error::TransportError;
use wolfies_broadcast::transport::{
    AliasLookup, ChatMessage, Conversation, FetchOptions, MessageContent, SessionState, Transport,
};
use wolfies_broadcast::RecipientIdentity;

/// Behaviour of one scripted send.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    /// Succeed and append the text to history.
    Deliver,
    /// Succeed but do not persist anything (platform silently dropped it).
    Drop,
    Fail(TransportError),
    /// Never settle.
    Hang,
    /// Succeed, then report the session as lost.
    DeliverThenDisconnect(String),
}

#[derive(Default)]
pub struct MockTransport {
    history: Mutex<HashMap<String, Vec<ChatMessage>>>,
    scripts: Mutex<HashMap<String, VecDeque<SendBehavior>>>,
    sends: Mutex<Vec<(String, MessageContent)>>,
    history_errors: Mutex<HashMap<String, usize>>,
    state: Mutex<SessionState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue send behaviours for an identity. Unscripted sends deliver.
    pub fn script(self, identity: &str, behaviors: Vec<SendBehavior>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(identity.to_string(), behaviors.into());
        self
    }

    /// Seed a message we sent earlier.
    pub fn sent_before(self, identity: &str, body: &str, at: DateTime<Utc>) -> Self {
        self.history
            .lock()
            .unwrap()
            .entry(identity.to_string())
            .or_default()
            .push(ChatMessage {
                body: body.to_string(),
                timestamp: at,
                from_me: true,
            });
        self
    }

    /// Make the next `count` history reads for an identity fail.
    pub fn failing_history(self, identity: &str, count: usize) -> Self {
        self.history_errors
            .lock()
            .unwrap()
            .insert(identity.to_string(), count);
        self
    }

    /// Content of every send to an identity, in order.
    pub fn contents_sent_to(&self, identity: &str) -> Vec<MessageContent> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == identity)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn sends_to(&self, identity: &str) -> usize {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == identity)
            .count()
    }

    pub fn disconnect(&self, reason: &str) {
        *self.state.lock().unwrap() = SessionState::Disconnected(reason.to_string());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(
        &self,
        identity: &RecipientIdentity,
        content: &MessageContent,
    ) -> Result<(), TransportError> {
        let key = identity.as_str().to_string();
        let body = content.as_text().unwrap_or_default().to_string();
        self.sends.lock().unwrap().push((key.clone(), content.clone()));

        let behavior = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .unwrap_or(SendBehavior::Deliver);

        let persist = |body: String| {
            self.history
                .lock()
                .unwrap()
                .entry(key.clone())
                .or_default()
                .push(ChatMessage {
                    body,
                    timestamp: Utc::now(),
                    from_me: true,
                });
        };

        match behavior {
            SendBehavior::Deliver => {
                persist(body);
                Ok(())
            }
            SendBehavior::Drop => Ok(()),
            SendBehavior::Fail(e) => Err(e),
            SendBehavior::Hang => std::future::pending().await,
            SendBehavior::DeliverThenDisconnect(reason) => {
                persist(body);
                self.disconnect(&reason);
                Ok(())
            }
        }
    }

    async fn fetch_last_messages(
        &self,
        identity: &RecipientIdentity,
        options: FetchOptions,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        if let Some(remaining) = self.history_errors.lock().unwrap().get_mut(identity.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Io("history unavailable".to_string()));
            }
        }

        let history = self.history.lock().unwrap();
        let mut messages: Vec<ChatMessage> = history
            .get(identity.as_str())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| !options.from_me_only || m.from_me)
            .collect();
        let skip = messages.len().saturating_sub(options.limit as usize);
        messages.drain(..skip);
        Ok(messages)
    }

    async fn resolve_alias(&self, _: &RecipientIdentity) -> Result<AliasLookup, TransportError> {
        Err(TransportError::Rejected("alias lookup unsupported".to_string()))
    }

    async fn resolve_canonical_id(
        &self,
        _: &RecipientIdentity,
    ) -> Result<RecipientIdentity, TransportError> {
        Err(TransportError::Rejected("canonical lookup unsupported".to_string()))
    }

    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        Ok(Vec::new())
    }

    fn session_state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }
}
