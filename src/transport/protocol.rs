//! Session bridge protocol types for NDJSON communication over UNIX socket.
//!
//! One request per line, one response per line:
//!
//! ```json
//! {"id": "uuid", "v": 1, "method": "send_message", "params": {...}}
//! {"id": "uuid", "ok": true, "result": {...}, "error": null, "meta": {...}}
//! ```
//!
//! CHANGELOG:
//! - 10/13/2026 - Client-side request/response for the session bridge

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u8 = 1;

/// Error code for recipients that must be addressed by alias.
pub const CODE_ALIAS_REQUIRED: &str = "ALIAS_REQUIRED";

/// Error code for a lost platform session.
pub const CODE_DISCONNECTED: &str = "DISCONNECTED";

/// NDJSON request from client to bridge.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID (UUID)
    pub id: String,
    /// Protocol version (currently 1)
    pub v: u8,
    /// Method name (e.g., "send_message", "fetch_messages")
    pub method: String,
    /// Method parameters
    pub params: Value,
}

/// NDJSON response from bridge to client.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Request ID (matches request)
    pub id: String,
    /// Success flag
    pub ok: bool,
    /// Result data (if successful)
    #[serde(default)]
    pub result: Option<Value>,
    /// Error information (if failed)
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

/// Error details in response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (e.g., "ALIAS_REQUIRED", "DISCONNECTED", "ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Response metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Bridge execution time in milliseconds
    pub server_ms: Option<f64>,
    pub protocol_v: Option<u8>,
}

impl Request {
    /// Create a new request with a fresh id.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            v: PROTOCOL_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Create a request with no parameters.
    pub fn no_params(method: impl Into<String>) -> Self {
        Self::new(method, Value::Object(serde_json::Map::new()))
    }

    /// Serialize request to NDJSON line.
    pub fn to_ndjson_line(&self) -> Result<String, TransportError> {
        let json = serde_json::to_string(self).map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(format!("{}\n", json))
    }
}

impl Response {
    /// Parse response from NDJSON line.
    pub fn from_ndjson_line(line: &str) -> Result<Self, TransportError> {
        serde_json::from_str(line.trim()).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    /// Unwrap the result payload, mapping bridge error codes to transport errors.
    pub fn into_result(self, expected_id: &str) -> Result<Value, TransportError> {
        if self.id != expected_id {
            return Err(TransportError::Protocol(format!(
                "response id {} does not match request {}",
                self.id, expected_id
            )));
        }

        if self.ok {
            return Ok(self.result.unwrap_or(Value::Null));
        }

        let info = self.error.unwrap_or(ErrorInfo {
            code: "ERROR".to_string(),
            message: "bridge reported failure without details".to_string(),
            details: None,
        });

        Err(match info.code.as_str() {
            CODE_ALIAS_REQUIRED => TransportError::AliasRequired,
            CODE_DISCONNECTED => TransportError::Disconnected(info.message),
            _ => TransportError::Rejected(info.message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_line_is_single_json_object() {
        let req = Request::new("send_message", json!({"to": "5547999512346@c.us"}));
        let line = req.to_ndjson_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: Request = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed.method, "send_message");
        assert_eq!(parsed.v, PROTOCOL_VERSION);
    }

    #[test]
    fn test_success_response() {
        let resp = Response::from_ndjson_line(r#"{"id":"a","ok":true,"result":{"n":1}}"#).unwrap();
        assert_eq!(resp.into_result("a").unwrap(), json!({"n": 1}));
    }

    #[test]
    fn test_alias_required_code() {
        let resp = Response::from_ndjson_line(
            r#"{"id":"a","ok":false,"error":{"code":"ALIAS_REQUIRED","message":"use lid"}}"#,
        )
        .unwrap();
        assert_eq!(resp.into_result("a"), Err(TransportError::AliasRequired));
    }

    #[test]
    fn test_disconnected_code() {
        let resp = Response::from_ndjson_line(
            r#"{"id":"a","ok":false,"error":{"code":"DISCONNECTED","message":"logged out"}}"#,
        )
        .unwrap();
        assert_eq!(
            resp.into_result("a"),
            Err(TransportError::Disconnected("logged out".to_string()))
        );
    }

    #[test]
    fn test_mismatched_id() {
        let resp = Response::from_ndjson_line(r#"{"id":"b","ok":true}"#).unwrap();
        assert!(matches!(resp.into_result("a"), Err(TransportError::Protocol(_))));
    }
}
