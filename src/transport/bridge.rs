//! Unix socket client for the session bridge.
//!
//! The bridge is an external process that owns the authenticated messaging
//! session (pairing, browser automation, media handling). This client opens
//! one connection per request, the same way the daemon clients do.
//!
//! CHANGELOG:
//! - 10/16/2026 - Unreachable socket marks the session disconnected
//! - 10/13/2026 - Initial implementation

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::watch;

use super::protocol::{Request, Response};
use super::{AliasLookup, ChatMessage, Conversation, FetchOptions, MessageContent, SessionState, Transport};
use crate::contacts::RecipientIdentity;
use crate::error::TransportError;

/// Transport backed by the session bridge daemon.
pub struct BridgeTransport {
    socket_path: PathBuf,
    io_timeout: Duration,
    state: watch::Sender<SessionState>,
}

impl BridgeTransport {
    pub fn new(socket_path: impl AsRef<Path>, io_timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::Connected);
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            io_timeout,
            state,
        }
    }

    fn mark_disconnected(&self, reason: &str) {
        tracing::warn!(socket = %self.socket_path.display(), reason, "session bridge disconnected");
        self.state.send_replace(SessionState::Disconnected(reason.to_string()));
    }

    /// Bridge health payload.
    pub async fn health(&self) -> Result<Value, TransportError> {
        self.call(Request::no_params("health")).await
    }

    async fn call(&self, request: Request) -> Result<Value, TransportError> {
        let result = self.exchange(&request).await;
        if let Err(TransportError::Disconnected(reason)) = &result {
            self.mark_disconnected(reason);
        }
        result
    }

    async fn exchange(&self, request: &Request) -> Result<Value, TransportError> {
        if !self.socket_path.exists() {
            return Err(TransportError::Disconnected(format!(
                "socket not found: {}",
                self.socket_path.display()
            )));
        }

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| TransportError::Disconnected(format!("connect failed: {}", e)))?;
        let (read_half, mut write_half) = stream.into_split();

        let line = request.to_ndjson_line()?;
        tracing::debug!(method = %request.method, id = %request.id, "bridge request");
        write_half
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        write_half.flush().await.map_err(|e| TransportError::Io(e.to_string()))?;

        let mut reader = BufReader::new(read_half);
        let mut response_line = String::new();
        let bytes_read = tokio::time::timeout(self.io_timeout, reader.read_line(&mut response_line))
            .await
            .map_err(|_| TransportError::Io("timeout waiting for bridge response".to_string()))?
            .map_err(|e| TransportError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(TransportError::Disconnected("bridge closed connection".to_string()));
        }

        Response::from_ndjson_line(&response_line)?.into_result(&request.id)
    }

    async fn call_as<T: DeserializeOwned>(&self, request: Request) -> Result<T, TransportError> {
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| TransportError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn send_message(
        &self,
        identity: &RecipientIdentity,
        content: &MessageContent,
    ) -> Result<(), TransportError> {
        self.call(Request::new(
            "send_message",
            json!({ "to": identity, "content": content }),
        ))
        .await
        .map(|_| ())
    }

    async fn fetch_last_messages(
        &self,
        identity: &RecipientIdentity,
        options: FetchOptions,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        self.call_as(Request::new(
            "fetch_messages",
            json!({
                "chat": identity,
                "from_me_only": options.from_me_only,
                "limit": options.limit,
            }),
        ))
        .await
    }

    async fn resolve_alias(&self, identity: &RecipientIdentity) -> Result<AliasLookup, TransportError> {
        self.call_as(Request::new("resolve_alias", json!({ "id": identity })))
            .await
    }

    async fn resolve_canonical_id(
        &self,
        identity: &RecipientIdentity,
    ) -> Result<RecipientIdentity, TransportError> {
        self.call_as(Request::new("resolve_canonical_id", json!({ "id": identity })))
            .await
    }

    async fn list_active_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        self.call_as(Request::no_params("list_conversations")).await
    }

    fn session_state(&self) -> SessionState {
        self.state.borrow().clone()
    }
}
