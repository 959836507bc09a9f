//! Per-connection session state and correlation tables.
//!
//! One [`Session`] exists per served transport. It owns the lifecycle
//! state machine and the three tables correlation depends on:
//!
//! - ids of every client request ever seen (duplicate detection, ids are
//!   never reused within a session);
//! - outstanding server-to-client requests (id to oneshot continuation);
//! - the minting counter for the server-to-client id space.

use async_lock::Mutex;
use futures::channel::oneshot;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tinymcp_core::capability::{ClientCapabilities, ClientInfo};
use tinymcp_core::protocol::{RequestId, Response};
use tinymcp_core::EngineError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle of a session.
///
/// `Uninitialized` accepts only `initialize`; `Initialized` waits for the
/// client's `notifications/initialized` ack; `Active` serves traffic;
/// `Closed` is terminal and entered from any state when the transport
/// goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport is up, handshake not started.
    Uninitialized,
    /// `initialize` answered, waiting for the client's ready ack.
    Initialized,
    /// Handshake complete; normal traffic flows.
    Active,
    /// Terminal. Entered on transport close from any state.
    Closed,
}

/// Per-connection session: lifecycle state plus correlation tables.
pub struct Session {
    id: Uuid,
    state: Mutex<SessionState>,
    client_info: Mutex<Option<ClientInfo>>,
    client_caps: Mutex<ClientCapabilities>,
    seen_ids: Mutex<HashSet<RequestId>>,
    pending_s2c: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
    next_s2c: AtomicU64,
}

impl Session {
    /// Create a fresh session in the `Uninitialized` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(SessionState::Uninitialized),
            client_info: Mutex::new(None),
            client_caps: Mutex::new(ClientCapabilities::default()),
            seen_ids: Mutex::new(HashSet::new()),
            pending_s2c: Mutex::new(HashMap::new()),
            next_s2c: AtomicU64::new(1),
        }
    }

    /// The session id, for log correlation.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Record the `initialize` handshake.
    ///
    /// # Errors
    ///
    /// A second `initialize` on an already-handshaken session is an
    /// invalid request; on a closed session it fails as closed.
    pub async fn begin_initialize(
        &self,
        info: ClientInfo,
        caps: ClientCapabilities,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Uninitialized => {
                *state = SessionState::Initialized;
                *self.client_info.lock().await = Some(info);
                *self.client_caps.lock().await = caps;
                debug!(session = %self.id, "Session initialized");
                Ok(())
            }
            SessionState::Initialized | SessionState::Active => Err(EngineError::invalid_request(
                "initialize received on an already-initialized session",
            )),
            SessionState::Closed => Err(EngineError::SessionClosed),
        }
    }

    /// Record the client's `notifications/initialized` ack.
    ///
    /// Out-of-order acks are logged and ignored; notifications never get
    /// error replies.
    pub async fn activate(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionState::Initialized {
            *state = SessionState::Active;
            debug!(session = %self.id, "Session active");
        } else {
            warn!(session = %self.id, state = ?*state, "Ignoring initialized ack in wrong state");
        }
    }

    /// Check that normal traffic is allowed for `method`.
    ///
    /// # Errors
    ///
    /// Fails with a not-initialized error before the handshake completes
    /// and with a closed error afterwards.
    pub async fn require_active(&self, method: &str) -> Result<(), EngineError> {
        match self.state().await {
            SessionState::Active => Ok(()),
            SessionState::Uninitialized | SessionState::Initialized => {
                Err(EngineError::not_initialized(method))
            }
            SessionState::Closed => Err(EngineError::SessionClosed),
        }
    }

    /// Transition to `Closed` and fail every outstanding reversed call.
    ///
    /// Dropping the continuations resumes each suspended handler with a
    /// session-closed error.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionState::Closed {
            return;
        }
        *state = SessionState::Closed;
        drop(state);

        let drained: Vec<_> = self.pending_s2c.lock().await.drain().collect();
        if !drained.is_empty() {
            debug!(
                session = %self.id,
                pending = drained.len(),
                "Session closed with reversed calls in flight"
            );
        }
        // Senders drop here; each waiting handler observes cancellation.
    }

    /// Record an inbound client request id.
    ///
    /// # Errors
    ///
    /// Fails as an invalid request when the id was already used in this
    /// session, in flight or completed.
    pub async fn register_inbound(&self, id: &RequestId) -> Result<(), EngineError> {
        let mut seen = self.seen_ids.lock().await;
        if seen.insert(id.clone()) {
            Ok(())
        } else {
            Err(EngineError::invalid_request(format!(
                "duplicate request id {id}"
            )))
        }
    }

    /// Mint the next id in the server-to-client space.
    #[must_use]
    pub fn mint_s2c_id(&self) -> RequestId {
        RequestId::s2c(self.next_s2c.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a continuation for an outstanding server-to-client request.
    ///
    /// # Errors
    ///
    /// Fails as closed when the session is no longer open, so reversed
    /// calls issued during teardown resolve immediately.
    pub async fn register_s2c(
        &self,
        id: RequestId,
        sender: oneshot::Sender<Response>,
    ) -> Result<(), EngineError> {
        if self.state().await == SessionState::Closed {
            return Err(EngineError::SessionClosed);
        }
        self.pending_s2c.lock().await.insert(id, sender);
        Ok(())
    }

    /// Take the continuation for an inbound response, if we asked for it.
    pub async fn take_s2c(&self, id: &RequestId) -> Option<oneshot::Sender<Response>> {
        self.pending_s2c.lock().await.remove(id)
    }

    /// The client's declared capabilities, as recorded by the handshake.
    pub async fn client_capabilities(&self) -> ClientCapabilities {
        self.client_caps.lock().await.clone()
    }

    /// The client's identity, once the handshake has happened.
    pub async fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.lock().await.clone()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
