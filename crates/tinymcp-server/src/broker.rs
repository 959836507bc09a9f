//! Reversed-call broker: server-to-client requests issued mid-handler.
//!
//! A tool handler that needs an LLM completion (`sampling/createMessage`)
//! or a user decision (`elicitation/create`) suspends on a oneshot while
//! the request travels to the client. The suspension consumes no thread;
//! the session keeps serving other traffic. The handler resumes when the
//! client answers, the per-kind timeout elapses, the outer call is
//! cancelled, or the session closes, whichever comes first.

use crate::provider::CancellationToken;
use crate::session::Session;
use futures::channel::mpsc::UnboundedSender;
use futures::channel::oneshot;
use std::sync::Arc;
use std::time::Duration;
use tinymcp_core::protocol::{Message, Notification, Request, RequestId};
use tinymcp_core::types::{
    CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult,
};
use tinymcp_core::EngineError;
use tracing::{debug, warn};

use crate::router::{methods, notifications};

/// Timeout budgets for reversed calls, per kind.
///
/// Sampling waits on a model; elicitation waits on a human, so it gets a
/// longer default.
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    /// Budget for `sampling/createMessage`.
    pub sampling_timeout: Duration,
    /// Budget for `elicitation/create`.
    pub elicitation_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            sampling_timeout: Duration::from_secs(30),
            elicitation_timeout: Duration::from_secs(120),
        }
    }
}

/// Handle a tool handler uses to issue reversed calls.
///
/// Cloneable; each clone shares the session's outstanding table and the
/// outer call's cancellation token. A tool that never declared reversed
/// calls gets a disabled handle that rejects without any traffic.
#[derive(Clone)]
pub struct ReversedCaller {
    session: Arc<Session>,
    outgoing: UnboundedSender<Message>,
    config: BrokerConfig,
    cancel: CancellationToken,
    enabled: bool,
}

impl ReversedCaller {
    pub(crate) fn new(
        session: Arc<Session>,
        outgoing: UnboundedSender<Message>,
        config: BrokerConfig,
        cancel: CancellationToken,
        enabled: bool,
    ) -> Self {
        Self {
            session,
            outgoing,
            config,
            cancel,
            enabled,
        }
    }

    fn require_enabled(&self) -> Result<(), EngineError> {
        if self.enabled {
            Ok(())
        } else {
            Err(EngineError::CapabilityNotSupported {
                capability: "reversed calls".to_string(),
            })
        }
    }

    /// Ask the client for an LLM completion.
    ///
    /// # Errors
    ///
    /// Fails when the owning tool never declared reversed calls, the
    /// client never declared the sampling capability, the call times
    /// out, the outer call is cancelled, the session closes, or the
    /// client answers with an error.
    pub async fn create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, EngineError> {
        self.require_enabled()?;
        if !self.session.client_capabilities().await.has_sampling() {
            return Err(EngineError::CapabilityNotSupported {
                capability: "sampling".to_string(),
            });
        }
        let params = serde_json::to_value(&request)?;
        let value = self
            .call(methods::SAMPLING_CREATE_MESSAGE, params, self.config.sampling_timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask the client's user a question.
    ///
    /// # Errors
    ///
    /// Fails when the owning tool never declared reversed calls, the
    /// client never declared the elicitation capability, the call times
    /// out, the outer call is cancelled, the session closes, or the
    /// client answers with an error.
    pub async fn elicit(&self, request: ElicitRequest) -> Result<ElicitResult, EngineError> {
        self.require_enabled()?;
        if !self.session.client_capabilities().await.has_elicitation() {
            return Err(EngineError::CapabilityNotSupported {
                capability: "elicitation".to_string(),
            });
        }
        let params = serde_json::to_value(&request)?;
        let value = self
            .call(methods::ELICITATION_CREATE, params, self.config.elicitation_timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Issue one reversed call and suspend until it resolves.
    async fn call(
        &self,
        method: &'static str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, EngineError> {
        let id = self.session.mint_s2c_id();
        let (tx, rx) = oneshot::channel();
        self.session.register_s2c(id.clone(), tx).await?;

        let request = Request::with_params(method, id.clone(), params);
        if self
            .outgoing
            .unbounded_send(Message::Request(request))
            .is_err()
        {
            self.session.take_s2c(&id).await;
            return Err(EngineError::SessionClosed);
        }
        debug!(%id, method, "Reversed call issued");

        tokio::select! {
            outcome = rx => match outcome {
                Ok(response) => response.into_result().map_err(EngineError::from),
                // Continuation dropped: the session closed underneath us.
                Err(_) => Err(EngineError::SessionClosed),
            },
            () = tokio::time::sleep(timeout) => {
                self.abandon(&id, "timed out").await;
                Err(EngineError::ReversedCallTimedOut {
                    method: method.to_string(),
                    timeout,
                })
            }
            () = self.cancel.cancelled() => {
                self.abandon(&id, "outer call cancelled").await;
                Err(EngineError::cancelled(method))
            }
        }
    }

    /// Forget an outstanding reversed call and tell the peer, best effort.
    async fn abandon(&self, id: &RequestId, reason: &str) {
        if self.session.take_s2c(id).await.is_none() {
            // Already resolved or drained; nothing to retract.
            return;
        }
        warn!(%id, reason, "Abandoning reversed call");
        let notification = Notification::with_params(
            notifications::CANCELLED,
            serde_json::json!({ "requestId": id, "reason": reason }),
        );
        let _ = self
            .outgoing
            .unbounded_send(Message::Notification(notification));
    }
}

impl std::fmt::Debug for ReversedCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReversedCaller")
            .field("session", &self.session.id())
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .finish()
    }
}
