//! Capability negotiation types for the handshake.
//!
//! The `initialize` exchange carries each side's identity and declared
//! capability set. A server declares which capability kinds it exposes
//! (resources, tools, prompts); a client declares which reversed calls it
//! can answer (sampling, elicitation). There is no versioning negotiation
//! beyond this single exchange.

use serde::{Deserialize, Serialize};

/// The protocol version spoken by this engine.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity of a client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Create client info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Identity of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Create server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Marker object for a declared capability. Empty today; room for
/// per-capability options later without a wire break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityOptions {}

/// Capabilities a server declares during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Declared when the server exposes resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<CapabilityOptions>,
    /// Declared when the server exposes tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<CapabilityOptions>,
    /// Declared when the server exposes prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<CapabilityOptions>,
}

impl ServerCapabilities {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare resource support.
    #[must_use]
    pub fn with_resources(mut self) -> Self {
        self.resources = Some(CapabilityOptions::default());
        self
    }

    /// Declare tool support.
    #[must_use]
    pub fn with_tools(mut self) -> Self {
        self.tools = Some(CapabilityOptions::default());
        self
    }

    /// Declare prompt support.
    #[must_use]
    pub fn with_prompts(mut self) -> Self {
        self.prompts = Some(CapabilityOptions::default());
        self
    }

    /// Whether resources are declared.
    #[must_use]
    pub const fn has_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Whether tools are declared.
    #[must_use]
    pub const fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Whether prompts are declared.
    #[must_use]
    pub const fn has_prompts(&self) -> bool {
        self.prompts.is_some()
    }
}

/// Capabilities a client declares during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Declared when the client can answer `sampling/createMessage`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<CapabilityOptions>,
    /// Declared when the client can answer `elicitation/create`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<CapabilityOptions>,
}

impl ClientCapabilities {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare sampling support.
    #[must_use]
    pub fn with_sampling(mut self) -> Self {
        self.sampling = Some(CapabilityOptions::default());
        self
    }

    /// Declare elicitation support.
    #[must_use]
    pub fn with_elicitation(mut self) -> Self {
        self.elicitation = Some(CapabilityOptions::default());
        self
    }

    /// Whether sampling is declared.
    #[must_use]
    pub const fn has_sampling(&self) -> bool {
        self.sampling.is_some()
    }

    /// Whether elicitation is declared.
    #[must_use]
    pub const fn has_elicitation(&self) -> bool {
        self.elicitation.is_some()
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// The protocol version the client speaks.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// The client's identity.
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
    /// The client's declared capabilities.
    pub capabilities: ClientCapabilities,
}

impl InitializeRequest {
    /// Build an initialize request for this engine's protocol version.
    #[must_use]
    pub fn new(client_info: ClientInfo, capabilities: ClientCapabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info,
            capabilities,
        }
    }
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeResult {
    /// The protocol version the server speaks.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// The server's identity.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// The server's declared capabilities.
    pub capabilities: ServerCapabilities,
    /// Optional usage instructions for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResult {
    /// Build an initialize result for this engine's protocol version.
    #[must_use]
    pub fn new(server_info: ServerInfo, capabilities: ServerCapabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info,
            capabilities,
            instructions: None,
        }
    }

    /// Attach usage instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}
