//! Server construction.

use crate::broker::BrokerConfig;
use crate::provider::{PromptProvider, ResourceProvider, ToolExecutor};
use crate::registry::{CapabilityRegistry, RegistryError};
use crate::server::Server;
use std::sync::Arc;
use tinymcp_core::capability::{ServerCapabilities, ServerInfo};
use tinymcp_core::types::{Prompt, Resource, Tool};

/// Builder for [`Server`].
///
/// Registration happens here, before any session exists; duplicates fail
/// at the registration site. The declared capability set is derived from
/// what gets registered.
///
/// # Example
///
/// ```rust
/// use tinymcp_server::{Server, ToolContext, Arguments};
/// use tinymcp_core::types::{CallToolResult, Tool};
/// use tinymcp_core::EngineError;
///
/// # fn main() -> Result<(), tinymcp_server::RegistryError> {
/// let server = Server::builder("protein-server", "1.0.0")
///     .tool(
///         Tool::new("find_protein").description("Look up a protein"),
///         |_args: Arguments, _ctx: ToolContext| async {
///             Ok::<_, EngineError>(CallToolResult::text("P53_HUMAN"))
///         },
///     )?
///     .build();
/// # let _ = server;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ServerBuilder {
    info: ServerInfo,
    instructions: Option<String>,
    broker_config: BrokerConfig,
    registry: CapabilityRegistry,
}

impl ServerBuilder {
    pub(crate) fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo::new(name, version),
            instructions: None,
            broker_config: BrokerConfig::default(),
            registry: CapabilityRegistry::new(),
        }
    }

    /// Attach usage instructions returned from the handshake.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Override the reversed-call timeout budgets.
    #[must_use]
    pub const fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker_config = config;
        self
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Fails when a tool with the same name is already registered.
    pub fn tool(
        mut self,
        descriptor: Tool,
        executor: impl ToolExecutor + 'static,
    ) -> Result<Self, RegistryError> {
        self.registry.register_tool(descriptor, Arc::new(executor))?;
        Ok(self)
    }

    /// Register a resource.
    ///
    /// # Errors
    ///
    /// Fails when a resource with the same locator is already registered.
    pub fn resource(
        mut self,
        descriptor: Resource,
        provider: impl ResourceProvider + 'static,
    ) -> Result<Self, RegistryError> {
        self.registry
            .register_resource(descriptor, Arc::new(provider))?;
        Ok(self)
    }

    /// Register a prompt.
    ///
    /// # Errors
    ///
    /// Fails when a prompt with the same name is already registered.
    pub fn prompt(
        mut self,
        descriptor: Prompt,
        provider: impl PromptProvider + 'static,
    ) -> Result<Self, RegistryError> {
        self.registry
            .register_prompt(descriptor, Arc::new(provider))?;
        Ok(self)
    }

    /// Finish construction. The registry is frozen from here on.
    #[must_use]
    pub fn build(self) -> Server {
        let mut capabilities = ServerCapabilities::new();
        if self.registry.has_tools() {
            capabilities = capabilities.with_tools();
        }
        if self.registry.has_resources() {
            capabilities = capabilities.with_resources();
        }
        if self.registry.has_prompts() {
            capabilities = capabilities.with_prompts();
        }

        Server::new(
            self.info,
            self.instructions,
            capabilities,
            Arc::new(self.registry),
            self.broker_config,
        )
    }
}
