//! Tool descriptors and the `tools/call` wire shapes.

use super::content::Content;
use serde::{Deserialize, Serialize};

/// An invokable, parameterized server-side operation.
///
/// A tool declares up front whether it may stream progress and whether it
/// may issue reversed calls back to the client while executing. The engine
/// holds the tool to its declaration: progress from an undeclared stream
/// is dropped and an undeclared reversed call is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name, unique among tools.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema describing the tool's arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    /// Whether the tool may emit progress notifications.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub streams: bool,
    /// Whether the tool may issue reversed calls (sampling/elicitation).
    #[serde(
        rename = "reversedCalls",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub reversed_calls: bool,
}

impl Tool {
    /// Create a tool with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
            streams: false,
            reversed_calls: false,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Declare that this tool streams progress.
    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.streams = true;
        self
    }

    /// Declare that this tool may issue reversed calls.
    #[must_use]
    pub const fn with_reversed_calls(mut self) -> Self {
        self.reversed_calls = true;
        self
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// The tool to invoke.
    pub name: String,
    /// The tool arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// The tool's output content.
    pub content: Vec<Content>,
    /// Whether the output describes a recoverable tool-level failure.
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// A recoverable tool-level failure, described to the caller as content.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// All registered tools, in registration order.
    pub tools: Vec<Tool>,
}
