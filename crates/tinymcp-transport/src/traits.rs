//! Transport traits.
//!
//! The [`Transport`] trait is the seam between the protocol engine and the
//! byte-moving layer. It is runtime-agnostic and uses `impl Future` return
//! types so implementations can be written for any executor.

use std::future::Future;
use std::time::Instant;
use tinymcp_core::Message;

/// Metadata about a transport connection.
#[derive(Debug, Clone, Default)]
pub struct TransportMetadata {
    /// Transport type identifier (e.g., "memory").
    pub transport_type: String,
    /// Remote endpoint label, if applicable.
    pub remote_addr: Option<String>,
    /// Local endpoint label, if applicable.
    pub local_addr: Option<String>,
    /// When the connection was established.
    pub connected_at: Option<Instant>,
}

impl TransportMetadata {
    /// Create new metadata for a transport type.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            remote_addr: None,
            local_addr: None,
            connected_at: None,
        }
    }

    /// Set the remote endpoint label.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Set the local endpoint label.
    #[must_use]
    pub fn local_addr(mut self, addr: impl Into<String>) -> Self {
        self.local_addr = Some(addr.into());
        self
    }

    /// Mark the connection time.
    #[must_use]
    pub fn connected_now(mut self) -> Self {
        self.connected_at = Some(Instant::now());
        self
    }
}

/// Core transport trait for bidirectional message passing.
///
/// Implementations should be `Send + Sync` and handle concurrent access
/// safely. Send and receive are independent and can be called from
/// different tasks.
pub trait Transport: Send + Sync {
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a message over the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be sent.
    fn send(&self, msg: Message) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive a message from the transport.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    ///
    /// # Errors
    ///
    /// Returns an error if receiving failed.
    fn recv(&self) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send;

    /// Close the transport connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the close operation failed.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Check if the transport is still connected.
    fn is_connected(&self) -> bool;

    /// Get metadata about the transport.
    fn metadata(&self) -> TransportMetadata;
}
