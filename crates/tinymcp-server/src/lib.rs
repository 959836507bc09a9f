//! # tinymcp-server
//!
//! Server-side session engine for the tinymcp protocol:
//!
//! - **Registry**: immutable catalog of tools, resources and prompts
//! - **Session**: lifecycle state machine and correlation tables
//! - **Router**: method surface and typed request parsing
//! - **Streaming**: ordered, gap-free progress updates per call
//! - **Broker**: reversed calls (sampling, elicitation) that suspend the
//!   handler without blocking the session
//!
//! # Example
//!
//! ```rust
//! use tinymcp_server::{Server, ToolContext, Arguments};
//! use tinymcp_core::types::{CallToolResult, Tool};
//! use tinymcp_core::EngineError;
//!
//! # fn main() -> Result<(), tinymcp_server::RegistryError> {
//! let server = Server::builder("protein-server", "1.0.0")
//!     .instructions("Query the protein database")
//!     .tool(
//!         Tool::new("find_protein").description("Look up a protein by name"),
//!         |_args: Arguments, _ctx: ToolContext| async {
//!             Ok::<_, EngineError>(CallToolResult::text("P53_HUMAN"))
//!         },
//!     )?
//!     .build();
//!
//! assert!(server.capabilities().has_tools());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod broker;
pub mod builder;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;

pub use broker::{BrokerConfig, ReversedCaller};
pub use builder::ServerBuilder;
pub use progress::ProgressSender;
pub use provider::{
    Arguments, CancellationToken, PromptProvider, ResourceProvider, ToolContext, ToolExecutor,
};
pub use registry::{CapabilityRegistry, RegistryError};
pub use server::Server;
pub use session::{Session, SessionState};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::broker::{BrokerConfig, ReversedCaller};
    pub use crate::provider::{
        Arguments, CancellationToken, PromptProvider, ResourceProvider, ToolContext, ToolExecutor,
    };
    pub use crate::registry::{CapabilityRegistry, RegistryError};
    pub use crate::server::Server;
    pub use crate::session::{Session, SessionState};
}
