//! # tinymcp-client
//!
//! Client-side session engine for the tinymcp protocol:
//!
//! - Handshake with capability declaration
//! - Typed wrappers for the method surface (tools, resources, prompts)
//! - Response correlation for concurrent in-flight requests
//! - Reversed-call answering (sampling, elicitation) via [`ClientHandler`]
//! - Progress delivery for streaming calls
//!
//! # Example
//!
//! ```no_run
//! use tinymcp_client::ClientBuilder;
//! use tinymcp_transport::MemoryTransport;
//!
//! # async fn example() -> Result<(), tinymcp_core::EngineError> {
//! let (transport, _server_side) = MemoryTransport::pair();
//! let client = ClientBuilder::new()
//!     .name("workshop-client")
//!     .version("1.0.0")
//!     .build(transport)
//!     .await?;
//!
//! let result = client
//!     .call_tool("find_protein", serde_json::json!({"name": "TP53"}))
//!     .await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod builder;
pub mod client;
pub mod handler;

pub use builder::ClientBuilder;
pub use client::Client;
pub use handler::{ClientHandler, NoOpHandler};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::ClientBuilder;
    pub use crate::client::Client;
    pub use crate::handler::{ClientHandler, NoOpHandler};
}
