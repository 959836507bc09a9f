//! Capability registry: the immutable catalog of what a server exposes.
//!
//! Registration happens once while building the server; after start the
//! registry is shared behind an `Arc` and never mutated, so listing and
//! resolution need no locking and listing order is stable for the life of
//! the process.

use crate::provider::{PromptProvider, ResourceProvider, ToolExecutor};
use std::sync::Arc;
use thiserror::Error;
use tinymcp_core::types::{Prompt, Resource, Tool};

/// Errors raised while populating a registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    /// A resource with this locator is already registered.
    #[error("resource '{0}' is already registered")]
    DuplicateResource(String),

    /// A prompt with this name is already registered.
    #[error("prompt '{0}' is already registered")]
    DuplicatePrompt(String),
}

/// A registered tool: its descriptor plus the executor behind it.
pub struct ToolEntry {
    /// The advertised descriptor.
    pub descriptor: Tool,
    /// The executor invoked by `tools/call`.
    pub executor: Arc<dyn ToolExecutor>,
}

/// A registered resource: its descriptor plus the provider behind it.
pub struct ResourceEntry {
    /// The advertised descriptor.
    pub descriptor: Resource,
    /// The provider invoked by `resources/read`.
    pub provider: Arc<dyn ResourceProvider>,
}

/// A registered prompt: its descriptor plus the provider behind it.
pub struct PromptEntry {
    /// The advertised descriptor.
    pub descriptor: Prompt,
    /// The provider invoked by `prompts/get`.
    pub provider: Arc<dyn PromptProvider>,
}

/// The catalog of tools, resources and prompts a server exposes.
///
/// Entries are listed in registration order. Names (and resource locators)
/// are unique within their kind; a duplicate registration is an error, not
/// a silent override.
#[derive(Default)]
pub struct CapabilityRegistry {
    tools: Vec<ToolEntry>,
    resources: Vec<ResourceEntry>,
    prompts: Vec<PromptEntry>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] if a tool with the same
    /// name is already registered.
    pub fn register_tool(
        &mut self,
        descriptor: Tool,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<(), RegistryError> {
        if self.tools.iter().any(|t| t.descriptor.name == descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        self.tools.push(ToolEntry {
            descriptor,
            executor,
        });
        Ok(())
    }

    /// Register a resource.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateResource`] if a resource with the
    /// same locator is already registered.
    pub fn register_resource(
        &mut self,
        descriptor: Resource,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<(), RegistryError> {
        if self
            .resources
            .iter()
            .any(|r| r.descriptor.uri == descriptor.uri)
        {
            return Err(RegistryError::DuplicateResource(descriptor.uri));
        }
        self.resources.push(ResourceEntry {
            descriptor,
            provider,
        });
        Ok(())
    }

    /// Register a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePrompt`] if a prompt with the same
    /// name is already registered.
    pub fn register_prompt(
        &mut self,
        descriptor: Prompt,
        provider: Arc<dyn PromptProvider>,
    ) -> Result<(), RegistryError> {
        if self
            .prompts
            .iter()
            .any(|p| p.descriptor.name == descriptor.name)
        {
            return Err(RegistryError::DuplicatePrompt(descriptor.name));
        }
        self.prompts.push(PromptEntry {
            descriptor,
            provider,
        });
        Ok(())
    }

    /// Tool descriptors in registration order.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Resource descriptors in registration order.
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|r| r.descriptor.clone())
            .collect()
    }

    /// Prompt descriptors in registration order.
    #[must_use]
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.iter().map(|p| p.descriptor.clone()).collect()
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn resolve_tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    /// Look up a resource by locator.
    #[must_use]
    pub fn resolve_resource(&self, uri: &str) -> Option<&ResourceEntry> {
        self.resources.iter().find(|r| r.descriptor.uri == uri)
    }

    /// Look up a prompt by name.
    #[must_use]
    pub fn resolve_prompt(&self, name: &str) -> Option<&PromptEntry> {
        self.prompts.iter().find(|p| p.descriptor.name == name)
    }

    /// Whether any tools are registered.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Whether any resources are registered.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }

    /// Whether any prompts are registered.
    #[must_use]
    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("tools", &self.tools.len())
            .field("resources", &self.resources.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolContext;
    use tinymcp_core::types::CallToolResult;
    use tinymcp_core::EngineError;

    fn noop_tool() -> Arc<dyn ToolExecutor> {
        Arc::new(
            |_args: Option<serde_json::Map<String, serde_json::Value>>, _ctx: ToolContext| async {
                Ok::<_, EngineError>(CallToolResult::text("ok"))
            },
        )
    }

    #[test]
    fn duplicate_tool_is_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_tool(Tool::new("find_protein"), noop_tool())
            .unwrap();
        let err = registry
            .register_tool(Tool::new("find_protein"), noop_tool())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "find_protein"));
    }

    #[test]
    fn listing_preserves_registration_order() {
        let mut registry = CapabilityRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register_tool(Tool::new(name), noop_tool()).unwrap();
        }
        let names: Vec<_> = registry.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn resolve_misses_return_none() {
        let registry = CapabilityRegistry::new();
        assert!(registry.resolve_tool("nope").is_none());
        assert!(registry.resolve_resource("protein://nope").is_none());
        assert!(registry.resolve_prompt("nope").is_none());
    }
}
