//! Unified error handling for the tinymcp engine.
//!
//! All engine errors flow through a single [`EngineError`] type with a fixed
//! code taxonomy. The wire representation is [`RpcError`], the JSON-RPC
//! error object carried inside failure responses.
//!
//! The taxonomy splits four ways:
//!
//! - **Transport errors** are fatal to a session and never cross the wire.
//! - **Protocol errors** (unknown method, request before handshake,
//!   duplicate id) are reported to the offending peer as a response error
//!   when correlatable, otherwise logged and dropped.
//! - **Handler errors** (tool failed, resource missing) always become a
//!   response error with a stable code; raw faults never leak.
//! - **Reversed-call errors** (timeout, session closed mid-flight) resume
//!   the suspended handler as ordinary failure values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard JSON-RPC and engine-specific error codes.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;

    /// The payload is not a valid request/response/notification envelope.
    pub const INVALID_REQUEST: i32 = -32600;

    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error; no implementation detail is leaked to the peer.
    pub const INTERNAL_ERROR: i32 = -32603;

    // Engine-specific codes in the JSON-RPC server error range.

    /// A tool handler failed while executing.
    pub const TOOL_EXECUTION_FAILED: i32 = -32000;

    /// A request arrived before the handshake completed.
    pub const NOT_INITIALIZED: i32 = -32001;

    /// The requested resource locator resolves to nothing.
    pub const RESOURCE_NOT_FOUND: i32 = -32002;

    /// A reversed call received no response within its budget.
    pub const REVERSED_CALL_TIMED_OUT: i32 = -32003;
}

/// The JSON-RPC error object carried inside failure responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code from the fixed taxonomy.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Additional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create an error with a code and message.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A "parse error" (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, message)
    }

    /// An "invalid request" error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    /// A "method not found" error (-32601).
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, message)
    }

    /// An "invalid params" error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    /// An "internal error" (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// The primary error type for the tinymcp engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid JSON or a structurally malformed envelope.
    #[error("parse error: {message}")]
    Parse {
        /// What was wrong with the bytes.
        message: String,
    },

    /// The payload decoded but is not a valid envelope (unknown outer
    /// fields, unpairable id shape, result and error together, ...).
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the envelope.
        message: String,
    },

    /// The method does not exist or is not registered.
    #[error("method not found: {method}")]
    MethodNotFound {
        /// The method that was requested.
        method: String,
    },

    /// Invalid method parameters.
    #[error("invalid params for '{method}': {message}")]
    InvalidParams {
        /// The method whose params were rejected.
        method: String,
        /// What was wrong with the params.
        message: String,
    },

    /// A request arrived before the session completed its handshake.
    #[error("session not initialized: '{method}' requires a completed handshake")]
    NotInitialized {
        /// The method that was attempted too early.
        method: String,
    },

    /// A requested resource locator resolved to nothing.
    #[error("resource not found: {uri}")]
    ResourceNotFound {
        /// The locator that missed.
        uri: String,
    },

    /// A tool handler failed while executing.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution {
        /// The tool that failed.
        tool: String,
        /// Why it failed.
        message: String,
        /// The underlying failure, when the tool was undone by a nested
        /// engine error (e.g. a reversed call that timed out).
        #[source]
        cause: Option<Box<EngineError>>,
    },

    /// A reversed call received no response within its configured budget.
    #[error("reversed call '{method}' timed out after {timeout:?}")]
    ReversedCallTimedOut {
        /// The reversed method that went unanswered.
        method: String,
        /// The budget that elapsed.
        timeout: std::time::Duration,
    },

    /// The session closed while the operation was in flight.
    #[error("session closed")]
    SessionClosed,

    /// The operation was cancelled before it completed.
    #[error("cancelled: {operation}")]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },

    /// A capability was used that the peer never declared.
    #[error("capability not supported: {capability}")]
    CapabilityNotSupported {
        /// The missing capability.
        capability: String,
    },

    /// Transport-level failure; fatal to the session.
    #[error("transport error: {message}")]
    Transport {
        /// What the transport reported.
        message: String,
    },

    /// An error reported by the remote peer in a failure response.
    #[error("peer error {code}: {message}")]
    Peer {
        /// The peer's error code.
        code: i32,
        /// The peer's message.
        message: String,
        /// The peer's structured detail.
        data: Option<serde_json::Value>,
    },

    /// Serialization failure while building or reading a payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An unexpected internal fault.
    #[error("internal error: {message}")]
    Internal {
        /// Internal description; never sent to the peer verbatim.
        message: String,
    },
}

impl EngineError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a method-not-found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create a not-initialized error.
    pub fn not_initialized(method: impl Into<String>) -> Self {
        Self::NotInitialized {
            method: method.into(),
        }
    }

    /// Create a resource-not-found error.
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound { uri: uri.into() }
    }

    /// Create a tool execution error.
    pub fn tool_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Create a tool execution error wrapping a nested engine failure.
    pub fn tool_error_caused_by(tool: impl Into<String>, cause: EngineError) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: cause.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The wire code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse { .. } => codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } | Self::CapabilityNotSupported { .. } => {
                codes::METHOD_NOT_FOUND
            }
            Self::InvalidParams { .. } => codes::INVALID_PARAMS,
            Self::NotInitialized { .. } => codes::NOT_INITIALIZED,
            Self::ResourceNotFound { .. } => codes::RESOURCE_NOT_FOUND,
            Self::ToolExecution { .. } => codes::TOOL_EXECUTION_FAILED,
            Self::ReversedCallTimedOut { .. } => codes::REVERSED_CALL_TIMED_OUT,
            Self::Peer { code, .. } => *code,
            Self::SessionClosed
            | Self::Cancelled { .. }
            | Self::Transport { .. }
            | Self::Serialization(_)
            | Self::Internal { .. } => codes::INTERNAL_ERROR,
        }
    }

    /// Whether this error is fatal to the session (transport class).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<&EngineError> for RpcError {
    fn from(err: &EngineError) -> Self {
        let data = match err {
            EngineError::ToolExecution {
                cause: Some(cause), ..
            } => Some(serde_json::json!({
                "cause": { "code": cause.code(), "message": cause.to_string() },
            })),
            EngineError::Peer { data, .. } => data.clone(),
            // Internal faults surface as a bare code; no detail leaks.
            EngineError::Internal { .. } | EngineError::Serialization(_) => {
                return Self::internal_error("internal error");
            }
            _ => None,
        };

        Self {
            code: err.code(),
            message: err.to_string(),
            data,
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(err: EngineError) -> Self {
        Self::from(&err)
    }
}

impl From<RpcError> for EngineError {
    fn from(err: RpcError) -> Self {
        Self::Peer {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}
