//! # tinymcp-core
//!
//! Core types for the tinymcp protocol engine.
//!
//! This crate provides the foundational building blocks:
//!
//! - **Protocol types**: JSON-RPC 2.0 request/response/notification types
//! - **Envelope codec**: strict, pure encode/decode of wire envelopes
//! - **Domain types**: Tools, resources, prompts, content, progress,
//!   sampling, elicitation
//! - **Capability negotiation**: Client and server capabilities
//! - **Error handling**: Unified `EngineError` type with wire-code mapping
//!
//! This crate is runtime-agnostic and does not depend on any async runtime.
//!
//! # Protocol Version
//!
//! This crate implements protocol version **2024-11-05**.
//!
//! # Example
//!
//! ```rust
//! use tinymcp_core::{
//!     types::Tool,
//!     capability::{ServerCapabilities, ServerInfo},
//! };
//!
//! let tool = Tool::new("find_protein")
//!     .description("Look up a protein by name")
//!     .input_schema(serde_json::json!({
//!         "type": "object",
//!         "properties": {
//!             "name": { "type": "string" }
//!         },
//!         "required": ["name"]
//!     }));
//!
//! let caps = ServerCapabilities::new().with_tools().with_resources();
//! let info = ServerInfo::new("protein-server", "1.0.0");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export commonly used types at the crate root
pub use capability::{
    ClientCapabilities, ClientInfo, InitializeRequest, InitializeResult, ServerCapabilities,
    ServerInfo, PROTOCOL_VERSION,
};
pub use error::{EngineError, RpcError};
pub use protocol::{Message, Notification, ProgressToken, Request, RequestId, Response};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use tinymcp_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::{
        ClientCapabilities, ClientInfo, InitializeRequest, InitializeResult, ServerCapabilities,
        ServerInfo, PROTOCOL_VERSION,
    };
    pub use crate::error::{EngineError, RpcError};
    pub use crate::protocol::{Message, Notification, ProgressToken, Request, RequestId, Response};
    pub use crate::types::{
        CallToolRequest, CallToolResult, Content, CreateMessageRequest, CreateMessageResult,
        ElicitAction, ElicitRequest, ElicitResult, GetPromptRequest, GetPromptResult,
        ListPromptsResult, ListResourcesResult, ListToolsResult, ProgressUpdate, Prompt,
        PromptArgument, PromptMessage, ReadResourceRequest, ReadResourceResult, Resource,
        ResourceContents, Role, SamplingMessage, StopReason, Tool,
    };
}
