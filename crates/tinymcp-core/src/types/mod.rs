//! Data-layer payload types: capabilities' contents and call results.

pub mod content;
pub mod elicitation;
pub mod progress;
pub mod prompt;
pub mod resource;
pub mod sampling;
pub mod tool;

pub use content::{Content, Role};
pub use elicitation::{ElicitAction, ElicitRequest, ElicitResult};
pub use progress::ProgressUpdate;
pub use prompt::{GetPromptRequest, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage};
pub use resource::{ListResourcesResult, ReadResourceRequest, ReadResourceResult, Resource, ResourceContents};
pub use sampling::{CreateMessageRequest, CreateMessageResult, SamplingMessage, StopReason};
pub use tool::{CallToolRequest, CallToolResult, ListToolsResult, Tool};
