//! Method names and inbound request parsing.
//!
//! The router is the single place that knows the wire method surface.
//! Requests are parsed into a typed representation before dispatch so the
//! server loop matches on an enum instead of strings.

use serde::de::DeserializeOwned;
use tinymcp_core::capability::InitializeRequest;
use tinymcp_core::protocol::Request;
use tinymcp_core::types::{CallToolRequest, GetPromptRequest, ReadResourceRequest};
use tinymcp_core::EngineError;

/// Request method names.
pub mod methods {
    /// Initialize the session and exchange capabilities.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness probe, answered with an empty result.
    pub const PING: &str = "ping";

    /// List available tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call a specific tool.
    pub const TOOLS_CALL: &str = "tools/call";

    /// List available resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read the contents of a resource.
    pub const RESOURCES_READ: &str = "resources/read";

    /// List available prompts.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Get a specific prompt with arguments.
    pub const PROMPTS_GET: &str = "prompts/get";

    /// Reversed call: ask the client for an LLM completion.
    pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";
    /// Reversed call: ask the client's user a question.
    pub const ELICITATION_CREATE: &str = "elicitation/create";
}

/// Notification method names.
pub mod notifications {
    /// Sent by the client after a successful handshake.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Sent when a request is retracted.
    pub const CANCELLED: &str = "notifications/cancelled";
    /// Progress of a long-running call.
    pub const PROGRESS: &str = "notifications/progress";
}

/// A client request parsed into its typed form.
#[derive(Debug)]
pub enum ParsedRequest {
    /// Handshake request.
    Initialize(InitializeRequest),
    /// Liveness probe.
    Ping,
    /// List registered tools.
    ToolsList,
    /// Invoke a tool.
    ToolsCall(CallToolRequest),
    /// List registered resources.
    ResourcesList,
    /// Read a resource payload.
    ResourcesRead(ReadResourceRequest),
    /// List registered prompts.
    PromptsList,
    /// Render a prompt.
    PromptsGet(GetPromptRequest),
    /// An unrecognized method name.
    Unknown(String),
}

fn typed_params<P: DeserializeOwned>(request: &Request) -> Result<P, EngineError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| EngineError::invalid_params(request.method(), "missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| EngineError::invalid_params(request.method(), e.to_string()))
}

/// Parse a request into its typed representation.
///
/// # Errors
///
/// Fails with an invalid-params error when the method is known but its
/// parameters do not match the expected shape.
pub fn parse_request(request: &Request) -> Result<ParsedRequest, EngineError> {
    match request.method() {
        methods::INITIALIZE => Ok(ParsedRequest::Initialize(typed_params(request)?)),
        methods::PING => Ok(ParsedRequest::Ping),
        methods::TOOLS_LIST => Ok(ParsedRequest::ToolsList),
        methods::TOOLS_CALL => Ok(ParsedRequest::ToolsCall(typed_params(request)?)),
        methods::RESOURCES_LIST => Ok(ParsedRequest::ResourcesList),
        methods::RESOURCES_READ => Ok(ParsedRequest::ResourcesRead(typed_params(request)?)),
        methods::PROMPTS_LIST => Ok(ParsedRequest::PromptsList),
        methods::PROMPTS_GET => Ok(ParsedRequest::PromptsGet(typed_params(request)?)),
        other => Ok(ParsedRequest::Unknown(other.to_string())),
    }
}
