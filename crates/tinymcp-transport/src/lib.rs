//! Transport abstractions for the tinymcp protocol engine.
//!
//! Transports handle the low-level details of moving JSON-RPC messages
//! between peers. The engine above them never touches bytes directly.
//!
//! # Overview
//!
//! - [`Transport`]: Core trait for bidirectional message passing
//! - [`MemoryTransport`]: Channel-backed transport for testing and
//!   in-process engines
//!
//! # Example
//!
//! ```rust
//! use tinymcp_transport::{MemoryTransport, Transport};
//!
//! let (client, server) = MemoryTransport::pair();
//! assert!(client.is_connected());
//! assert!(server.is_connected());
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use traits::{Transport, TransportMetadata};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::memory::MemoryTransport;
    pub use crate::traits::{Transport, TransportMetadata};
}
