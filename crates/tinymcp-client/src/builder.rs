//! Client construction and handshake.

use tinymcp_core::capability::{ClientCapabilities, ClientInfo};
use tinymcp_core::EngineError;
use tinymcp_transport::Transport;

use crate::client::{initialize, Client};
use crate::handler::{ClientHandler, NoOpHandler};

/// Builder for [`Client`].
///
/// Declares the client's identity and capabilities, then performs the
/// handshake when given a transport.
///
/// # Example
///
/// ```no_run
/// use tinymcp_client::ClientBuilder;
/// use tinymcp_transport::MemoryTransport;
///
/// # async fn example() -> Result<(), tinymcp_core::EngineError> {
/// let (transport, _server_side) = MemoryTransport::pair();
/// let client = ClientBuilder::new()
///     .name("workshop-client")
///     .version("1.0.0")
///     .build(transport)
///     .await?;
///
/// let tools = client.list_tools().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    name: String,
    version: String,
    capabilities: ClientCapabilities,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder with default identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "tinymcp-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: ClientCapabilities::default(),
        }
    }

    /// Set the client name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the client version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declare that this client answers `sampling/createMessage`.
    ///
    /// Only meaningful together with a handler that implements
    /// `create_message`.
    #[must_use]
    pub fn with_sampling(mut self) -> Self {
        self.capabilities = self.capabilities.with_sampling();
        self
    }

    /// Declare that this client answers `elicitation/create`.
    #[must_use]
    pub fn with_elicitation(mut self) -> Self {
        self.capabilities = self.capabilities.with_elicitation();
        self
    }

    /// Replace the capability set wholesale.
    #[must_use]
    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Perform the handshake and return a connected client with no
    /// reversed-call handler.
    ///
    /// # Errors
    ///
    /// Fails when the handshake is rejected or the transport drops.
    pub async fn build<T: Transport + 'static>(
        self,
        transport: T,
    ) -> Result<Client<T>, EngineError> {
        self.build_with_handler(transport, NoOpHandler).await
    }

    /// Perform the handshake and return a connected client that answers
    /// reversed calls through `handler`.
    ///
    /// # Errors
    ///
    /// Fails when the handshake is rejected or the transport drops.
    pub async fn build_with_handler<T: Transport + 'static, H: ClientHandler + 'static>(
        self,
        transport: T,
        handler: H,
    ) -> Result<Client<T, H>, EngineError> {
        let client_info = ClientInfo::new(&self.name, &self.version);
        let init_result = initialize(&transport, &client_info, &self.capabilities).await?;
        Ok(Client::with_handler(
            transport,
            init_result,
            client_info,
            self.capabilities,
            handler,
        ))
    }
}
