//! Prelude module for convenient imports.
//!
//! Import everything you need with a single use statement:
//!
//! ```rust
//! use tinymcp::prelude::*;
//!
//! let info = ServerInfo::new("protein-server", "1.0.0");
//! let caps = ServerCapabilities::new().with_tools();
//! ```

// Core types
pub use tinymcp_core::prelude::*;

// Server types
pub use tinymcp_server::{
    Arguments, BrokerConfig, CancellationToken, PromptProvider, ResourceProvider, ReversedCaller,
    Server, ServerBuilder, ToolContext, ToolExecutor,
};

// Transport types
pub use tinymcp_transport::{MemoryTransport, Transport, TransportMetadata};

// Client types
pub use tinymcp_client::{Client, ClientBuilder, ClientHandler, NoOpHandler};
