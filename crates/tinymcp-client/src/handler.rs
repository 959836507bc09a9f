//! Handler trait for server-initiated traffic.
//!
//! Servers can reverse the call direction mid-operation: `sampling/createMessage`
//! asks the client's model for a completion, `elicitation/create` asks the
//! client's user a question. They also push `notifications/progress` for
//! streaming calls. This module defines the trait a client implements to
//! answer that traffic.

use std::future::Future;
use tinymcp_core::types::{
    CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult, ProgressUpdate,
};
use tinymcp_core::EngineError;

/// Handler for server-initiated requests and notifications.
///
/// Every method has a default. Reversed calls default to a
/// capability-not-supported failure, which is what a server sees when it
/// calls into a capability the client never declared.
pub trait ClientHandler: Send + Sync {
    /// Answer a `sampling/createMessage` request.
    fn create_message(
        &self,
        _request: CreateMessageRequest,
    ) -> impl Future<Output = Result<CreateMessageResult, EngineError>> + Send {
        async {
            Err(EngineError::CapabilityNotSupported {
                capability: "sampling".to_string(),
            })
        }
    }

    /// Answer an `elicitation/create` request.
    fn elicit(
        &self,
        _request: ElicitRequest,
    ) -> impl Future<Output = Result<ElicitResult, EngineError>> + Send {
        async {
            Err(EngineError::CapabilityNotSupported {
                capability: "elicitation".to_string(),
            })
        }
    }

    /// Called for each `notifications/progress` pushed by the server.
    fn on_progress(&self, _update: ProgressUpdate) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called once the connection is established.
    fn on_connected(&self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called when the connection goes away, cleanly or not.
    fn on_disconnected(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// A handler that answers nothing.
///
/// Suitable for clients that only ever drive plain request/response calls
/// against servers with no reversed-calling tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl ClientHandler for NoOpHandler {}
