//! Transport error types.

use tinymcp_core::EngineError;
use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        Self::transport(err.to_string())
    }
}
