//! # tinymcp
//!
//! A two-layer protocol engine for tool-calling sessions between a client
//! application and a capability server, speaking JSON-RPC 2.0 envelopes.
//!
//! ## Features
//!
//! - **Capability registry**: tools, resources, and prompts registered
//!   before the session starts, frozen after
//! - **Session lifecycle**: explicit handshake before any operation
//! - **Streaming progress**: ordered, gap-free updates for long calls
//! - **Reversed calls**: a tool mid-execution can ask the *client* for an
//!   LLM completion (sampling) or a user decision (elicitation)
//! - **Runtime-agnostic transport seam** with an in-memory pair for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use tinymcp::prelude::*;
//! use tinymcp::types::{CallToolResult, Tool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::builder("protein-server", "1.0.0")
//!     .tool(
//!         Tool::new("find_protein").description("Look up a protein by name"),
//!         |_args: Arguments, _ctx: ToolContext| async {
//!             Ok::<_, EngineError>(CallToolResult::text("P53_HUMAN"))
//!         },
//!     )?
//!     .build();
//!
//! let (client_side, server_side) = MemoryTransport::pair();
//! tokio::spawn(async move { server.serve(server_side).await });
//!
//! let client = ClientBuilder::new()
//!     .name("workshop-client")
//!     .build(client_side)
//!     .await?;
//! let result = client
//!     .call_tool("find_protein", serde_json::json!({"name": "TP53"}))
//!     .await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`tinymcp_core`] - Envelope, error taxonomy, and wire types (no runtime)
//! - [`tinymcp_transport`] - Transport seam and the in-memory pair
//! - [`mod@tinymcp_server`] - Server-side session engine
//! - [`tinymcp_client`] - Client implementation

#![deny(missing_docs)]

// Re-export all public items from core
pub use tinymcp_core::*;

// Re-export server types
pub use tinymcp_server::{
    Arguments, BrokerConfig, CancellationToken, CapabilityRegistry, ProgressSender,
    PromptProvider, RegistryError, ResourceProvider, ReversedCaller, Server, ServerBuilder,
    SessionState, ToolContext, ToolExecutor,
};

// Re-export transport types
pub use tinymcp_transport::{MemoryTransport, Transport, TransportMetadata};

// Re-export client types
pub use tinymcp_client::{Client, ClientBuilder, ClientHandler, NoOpHandler};

pub mod prelude;

/// Server module re-exports
pub mod server {
    //! Server-side engine types.
    pub use tinymcp_server::*;
}

/// Transport module re-exports
pub mod transport {
    //! Transport layer types.
    pub use tinymcp_transport::*;
}

/// Client module re-exports
pub mod client {
    //! Client implementation types.
    pub use tinymcp_client::*;
}
