//! JSON-RPC 2.0 message types for the tinymcp engine.
//!
//! Every message on the wire is one of three shapes:
//!
//! - **Request**: a method call carrying a correlation id, expecting exactly
//!   one response
//! - **Response**: the reply to a request (success or error, never both)
//! - **Notification**: a one-way message with no id and no reply
//!
//! Correlation ids are unique per direction within a session. The
//! server-to-client id space is kept visibly disjoint from the
//! client-to-server space by minting string ids with an `"s2c:"` prefix
//! (see [`RequestId::s2c`]); the engine never relies on temporal ordering
//! to pair a response with its request.
//!
//! # Example
//!
//! ```rust
//! use tinymcp_core::protocol::{Request, RequestId, Message};
//!
//! let request = Request::new("tools/list", RequestId::Number(1));
//! let msg = Message::from(request);
//! assert_eq!(msg.method(), Some("tools/list"));
//! ```

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The JSON-RPC version string. Always "2.0".
pub const JSONRPC_VERSION: &str = "2.0";

/// A correlation id pairing a request with its response.
///
/// Ids may be numbers or strings. Within one session each direction mints
/// its own ids and never reuses one, even after the call completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id (client-to-server calls).
    Number(u64),
    /// String id (server-to-client reversed calls use the `"s2c:"` prefix).
    String(String),
}

impl RequestId {
    /// Mint an id in the server-to-client id space.
    ///
    /// The string prefix keeps the reversed-call id space disjoint from the
    /// client's numeric ids at a glance; correlation itself only ever
    /// consults the per-direction outstanding tables.
    #[must_use]
    pub fn s2c(n: u64) -> Self {
        Self::String(format!("s2c:{n}"))
    }

    /// Whether this id was minted in the server-to-client space.
    #[must_use]
    pub fn is_s2c(&self) -> bool {
        matches!(self, Self::String(s) if s.starts_with("s2c:"))
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A method call expecting exactly one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The correlation id echoed by the response.
    pub id: RequestId,
    /// The method to invoke.
    pub method: Cow<'static, str>,
    /// The method parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a request with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Create a request with parameters.
    #[must_use]
    pub fn with_params(
        method: impl Into<Cow<'static, str>>,
        id: impl Into<RequestId>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Get the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// The reply to a request: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The id of the request this responds to.
    pub id: RequestId,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a successful response.
    #[must_use]
    pub fn success(id: impl Into<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(id: impl Into<RequestId>, error: RpcError) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Whether this response carries a result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Unpack into a result, consuming self.
    pub fn into_result(self) -> Result<serde_json::Value, RpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            self.result.ok_or_else(|| {
                RpcError::internal_error("response carried neither result nor error")
            })
        }
    }
}

/// A one-way message with no id and no reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The notification method.
    pub method: Cow<'static, str>,
    /// The notification parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Create a notification with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: None,
        }
    }

    /// Create a notification with parameters.
    #[must_use]
    pub fn with_params(method: impl Into<Cow<'static, str>>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Get the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Tagged union over the three wire shapes.
///
/// The router matches exhaustively on this enum; there is deliberately no
/// loosely-typed catch-all payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    /// A method call.
    Request(Request),
    /// A reply to a method call.
    Response(Response),
    /// A one-way message.
    Notification(Notification),
}

impl Message {
    /// The method name, for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// The correlation id, for requests and responses.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) => None,
        }
    }

    /// Whether this is a request.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Whether this is a response.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Whether this is a notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl From<Notification> for Message {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

/// An opaque token correlating progress notifications to their call.
///
/// One token is minted per streaming call; each notification under a token
/// carries a sequence number that increases strictly by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// Numeric token.
    Number(u64),
    /// String token.
    String(String),
}

impl From<&RequestId> for ProgressToken {
    fn from(id: &RequestId) -> Self {
        match id {
            RequestId::Number(n) => Self::Number(*n),
            RequestId::String(s) => Self::String(s.clone()),
        }
    }
}

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_envelope_fields() {
        let request = Request::new("tools/list", 1u64);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"tools/list\""));
        assert!(json.contains("\"id\":1"));
    }

    #[test]
    fn response_success_and_error_are_exclusive() {
        let ok = Response::success(1u64, serde_json::json!({"tools": []}));
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let err = Response::error(2u64, RpcError::method_not_found("nope"));
        assert!(!err.is_success());
        assert_eq!(err.into_result().unwrap_err().code, -32601);
    }

    #[test]
    fn notification_has_no_id() {
        let n = Notification::with_params(
            "notifications/progress",
            serde_json::json!({"progress": 1, "total": 3}),
        );
        let json = serde_json::to_string(&n).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn s2c_ids_are_disjoint_from_numeric_ids() {
        let reversed = RequestId::s2c(7);
        assert!(reversed.is_s2c());
        assert_eq!(reversed.to_string(), "s2c:7");
        assert!(!RequestId::Number(7).is_s2c());
        assert_ne!(reversed, RequestId::Number(7));
    }

    #[test]
    fn progress_token_from_request_id() {
        let token = ProgressToken::from(&RequestId::Number(9));
        assert_eq!(token, ProgressToken::Number(9));

        let token = ProgressToken::from(&RequestId::s2c(3));
        assert_eq!(token, ProgressToken::String("s2c:3".to_string()));
    }
}
