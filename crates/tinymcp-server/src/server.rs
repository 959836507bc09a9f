//! The session engine: one served transport, one session.
//!
//! `serve` owns the read loop. All outgoing traffic, responses, progress
//! notifications and reversed calls alike, funnels through one unbounded
//! queue drained by a single writer task, so ordering on the wire is the
//! order of enqueue. Handlers run as spawned tasks and the loop keeps
//! serving while they work; two slow calls never block a third.

use crate::broker::{BrokerConfig, ReversedCaller};
use crate::builder::ServerBuilder;
use crate::progress::ProgressSender;
use crate::provider::{CancellationToken, ToolContext};
use crate::registry::CapabilityRegistry;
use crate::router::{methods, notifications, parse_request, ParsedRequest};
use crate::session::Session;
use async_lock::Mutex;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tinymcp_core::capability::{InitializeResult, ServerCapabilities, ServerInfo, PROTOCOL_VERSION};
use tinymcp_core::protocol::{
    Message, Notification, ProgressToken, Request, RequestId, Response,
};
use tinymcp_core::types::{
    CallToolRequest, GetPromptRequest, ListPromptsResult, ListResourcesResult, ListToolsResult,
    ReadResourceRequest,
};
use tinymcp_core::{EngineError, RpcError};
use tinymcp_transport::Transport;
use tracing::{debug, error, info, warn};

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// A protocol engine serving one session per transport.
///
/// Built once via [`Server::builder`]; `serve` may be called for each
/// connection. The registry and identity are shared immutably across
/// sessions.
pub struct Server {
    info: ServerInfo,
    instructions: Option<String>,
    capabilities: ServerCapabilities,
    registry: Arc<CapabilityRegistry>,
    broker_config: BrokerConfig,
}

impl Server {
    pub(crate) fn new(
        info: ServerInfo,
        instructions: Option<String>,
        capabilities: ServerCapabilities,
        registry: Arc<CapabilityRegistry>,
        broker_config: BrokerConfig,
    ) -> Self {
        Self {
            info,
            instructions,
            capabilities,
            registry,
            broker_config,
        }
    }

    /// Start building a server.
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(name, version)
    }

    /// The server's identity.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// The declared capability set, derived from registrations.
    #[must_use]
    pub const fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Serve one session over the given transport until it closes.
    ///
    /// Returns `Ok(())` on a clean peer close.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the connection fails mid-session.
    /// Protocol errors never end the session; they are answered or
    /// dropped per message.
    pub async fn serve<T: Transport + 'static>(&self, transport: T) -> Result<(), EngineError> {
        let transport = Arc::new(transport);
        let session = Arc::new(Session::new());
        let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded::<Message>();

        info!(session = %session.id(), server = %self.info.name, "Session started");

        let writer = {
            let transport = Arc::clone(&transport);
            let session_id = session.id();
            tokio::spawn(async move {
                while let Some(msg) = outgoing_rx.next().await {
                    if let Err(e) = transport.send(msg).await {
                        warn!(session = %session_id, error = %e, "Writer stopped");
                        break;
                    }
                }
            })
        };

        let outcome = loop {
            match transport.recv().await {
                Ok(Some(Message::Request(request))) => {
                    self.handle_request(request, &session, &outgoing_tx, &in_flight)
                        .await;
                }
                Ok(Some(Message::Response(response))) => {
                    Self::handle_response(response, &session).await;
                }
                Ok(Some(Message::Notification(notification))) => {
                    Self::handle_notification(notification, &session, &in_flight).await;
                }
                Ok(None) => {
                    debug!(session = %session.id(), "Peer closed the transport");
                    break Ok(());
                }
                Err(e) => {
                    error!(session = %session.id(), error = %e, "Transport failed");
                    break Err(EngineError::transport(e.to_string()));
                }
            }
        };

        // Teardown: fail suspended reversed calls, cancel running
        // handlers, stop the writer. Cancelled handlers never produce a
        // response past this point.
        session.close().await;
        for (_, token) in in_flight.lock().await.drain() {
            token.cancel();
        }
        drop(outgoing_tx);
        writer.abort();
        info!(session = %session.id(), "Session closed");

        outcome
    }

    async fn handle_request(
        &self,
        request: Request,
        session: &Arc<Session>,
        outgoing: &UnboundedSender<Message>,
        in_flight: &InFlight,
    ) {
        let id = request.id.clone();

        if let Err(e) = session.register_inbound(&id).await {
            send_error(outgoing, id, &e);
            return;
        }

        if request.method() == methods::INITIALIZE {
            self.handle_initialize(&request, session, outgoing).await;
            return;
        }

        if let Err(e) = session.require_active(request.method()).await {
            send_error(outgoing, id, &e);
            return;
        }

        let parsed = match parse_request(&request) {
            Ok(parsed) => parsed,
            Err(e) => {
                send_error(outgoing, id, &e);
                return;
            }
        };

        match parsed {
            // Handled above before the state check.
            ParsedRequest::Initialize(_) => {}
            ParsedRequest::Ping => send_result(outgoing, id, serde_json::json!({})),
            ParsedRequest::ToolsList => {
                let result = ListToolsResult {
                    tools: self.registry.tools(),
                };
                send_serialized(outgoing, id, &result);
            }
            ParsedRequest::ResourcesList => {
                let result = ListResourcesResult {
                    resources: self.registry.resources(),
                };
                send_serialized(outgoing, id, &result);
            }
            ParsedRequest::PromptsList => {
                let result = ListPromptsResult {
                    prompts: self.registry.prompts(),
                };
                send_serialized(outgoing, id, &result);
            }
            ParsedRequest::ToolsCall(call) => {
                self.dispatch_tool_call(id, call, session, outgoing, in_flight)
                    .await;
            }
            ParsedRequest::ResourcesRead(read) => {
                self.dispatch_resource_read(id, &read, outgoing);
            }
            ParsedRequest::PromptsGet(get) => {
                self.dispatch_prompt_get(id, get, outgoing);
            }
            ParsedRequest::Unknown(method) => {
                send_error(outgoing, id, &EngineError::method_not_found(method));
            }
        }
    }

    async fn handle_initialize(
        &self,
        request: &Request,
        session: &Arc<Session>,
        outgoing: &UnboundedSender<Message>,
    ) {
        let id = request.id.clone();
        let init = match parse_request(request) {
            Ok(ParsedRequest::Initialize(init)) => init,
            Ok(_) => return,
            Err(e) => {
                send_error(outgoing, id, &e);
                return;
            }
        };

        if init.protocol_version != PROTOCOL_VERSION {
            // Single-version engine: answer with our version, no negotiation.
            debug!(
                session = %session.id(),
                client_version = %init.protocol_version,
                "Client speaks a different protocol version"
            );
        }

        match session
            .begin_initialize(init.client_info, init.capabilities)
            .await
        {
            Ok(()) => {
                let mut result =
                    InitializeResult::new(self.info.clone(), self.capabilities.clone());
                if let Some(instructions) = &self.instructions {
                    result = result.instructions(instructions.clone());
                }
                send_serialized(outgoing, id, &result);
            }
            Err(e) => send_error(outgoing, id, &e),
        }
    }

    async fn dispatch_tool_call(
        &self,
        id: RequestId,
        call: CallToolRequest,
        session: &Arc<Session>,
        outgoing: &UnboundedSender<Message>,
        in_flight: &InFlight,
    ) {
        if !self.capabilities.has_tools() {
            send_error(
                outgoing,
                id,
                &EngineError::CapabilityNotSupported {
                    capability: "tools".to_string(),
                },
            );
            return;
        }
        let Some(entry) = self.registry.resolve_tool(&call.name) else {
            send_error(
                outgoing,
                id,
                &EngineError::method_not_found(format!("unknown tool '{}'", call.name)),
            );
            return;
        };
        let arguments = match call.arguments {
            None => None,
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(_) => {
                send_error(
                    outgoing,
                    id,
                    &EngineError::invalid_params(methods::TOOLS_CALL, "arguments must be an object"),
                );
                return;
            }
        };

        let executor = Arc::clone(&entry.executor);
        let tool = entry.descriptor.name.clone();
        let cancel = CancellationToken::new();
        // The context honors the tool's declared facilities: an
        // undeclared stream emits nowhere, an undeclared reversed call
        // is rejected before any traffic.
        let token = ProgressToken::from(&id);
        let progress = if entry.descriptor.streams {
            ProgressSender::new(token, outgoing.clone())
        } else {
            ProgressSender::disabled(token, outgoing.clone())
        };
        let reversed = ReversedCaller::new(
            Arc::clone(session),
            outgoing.clone(),
            self.broker_config,
            cancel.clone(),
            entry.descriptor.reversed_calls,
        );
        let ctx = ToolContext {
            progress: progress.clone(),
            reversed,
            cancel: cancel.clone(),
        };

        in_flight.lock().await.insert(id.clone(), cancel.clone());

        let in_flight = Arc::clone(in_flight);
        let outgoing = outgoing.clone();
        tokio::spawn(async move {
            debug!(%id, tool, "Tool call started");
            let outcome = executor.call(arguments, ctx).await;
            progress.finish();
            in_flight.lock().await.remove(&id);

            if cancel.is_cancelled() {
                debug!(%id, tool, "Suppressing response for cancelled call");
                return;
            }

            match outcome {
                Ok(result) => send_serialized(&outgoing, id, &result),
                Err(e) => {
                    let e = match e {
                        e @ (EngineError::InvalidParams { .. }
                        | EngineError::ToolExecution { .. }) => e,
                        other => EngineError::tool_error_caused_by(tool, other),
                    };
                    send_error(&outgoing, id, &e);
                }
            }
        });
    }

    fn dispatch_resource_read(
        &self,
        id: RequestId,
        read: &ReadResourceRequest,
        outgoing: &UnboundedSender<Message>,
    ) {
        if !self.capabilities.has_resources() {
            send_error(
                outgoing,
                id,
                &EngineError::CapabilityNotSupported {
                    capability: "resources".to_string(),
                },
            );
            return;
        }
        let Some(entry) = self.registry.resolve_resource(&read.uri) else {
            send_error(outgoing, id, &EngineError::resource_not_found(&read.uri));
            return;
        };

        let provider = Arc::clone(&entry.provider);
        let uri = read.uri.clone();
        let outgoing = outgoing.clone();
        tokio::spawn(async move {
            match provider.read(uri).await {
                Ok(result) => send_serialized(&outgoing, id, &result),
                Err(e) => send_error(&outgoing, id, &e),
            }
        });
    }

    fn dispatch_prompt_get(
        &self,
        id: RequestId,
        get: GetPromptRequest,
        outgoing: &UnboundedSender<Message>,
    ) {
        if !self.capabilities.has_prompts() {
            send_error(
                outgoing,
                id,
                &EngineError::CapabilityNotSupported {
                    capability: "prompts".to_string(),
                },
            );
            return;
        }
        let Some(entry) = self.registry.resolve_prompt(&get.name) else {
            send_error(
                outgoing,
                id,
                &EngineError::method_not_found(format!("unknown prompt '{}'", get.name)),
            );
            return;
        };

        let provider = Arc::clone(&entry.provider);
        let outgoing = outgoing.clone();
        tokio::spawn(async move {
            match provider.get(get.arguments).await {
                Ok(result) => send_serialized(&outgoing, id, &result),
                Err(e) => send_error(&outgoing, id, &e),
            }
        });
    }

    async fn handle_response(response: Response, session: &Arc<Session>) {
        match session.take_s2c(&response.id).await {
            Some(continuation) => {
                if continuation.send(response).is_err() {
                    // The reversed call already resolved (timeout or cancel).
                    debug!("Reversed-call continuation gone; dropping late response");
                }
            }
            None => {
                warn!(id = %response.id, "Response to unknown request id, dropping");
            }
        }
    }

    async fn handle_notification(
        notification: Notification,
        session: &Arc<Session>,
        in_flight: &InFlight,
    ) {
        match notification.method() {
            notifications::INITIALIZED => session.activate().await,
            notifications::CANCELLED => {
                let Some(id) = notification
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .and_then(|raw| serde_json::from_value::<RequestId>(raw.clone()).ok())
                else {
                    debug!("Malformed cancelled notification, ignoring");
                    return;
                };
                if let Some(token) = in_flight.lock().await.get(&id) {
                    info!(%id, "Cancelling in-flight call");
                    token.cancel();
                } else {
                    debug!(%id, "Cancel for unknown or completed call, ignoring");
                }
            }
            other => {
                debug!(method = other, "Ignoring unknown notification");
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("info", &self.info)
            .field("capabilities", &self.capabilities)
            .field("registry", &self.registry)
            .finish()
    }
}

fn send_message(outgoing: &UnboundedSender<Message>, msg: Message) {
    if outgoing.unbounded_send(msg).is_err() {
        debug!("Writer gone, dropping outbound message");
    }
}

fn send_result(outgoing: &UnboundedSender<Message>, id: RequestId, value: serde_json::Value) {
    send_message(outgoing, Message::Response(Response::success(id, value)));
}

fn send_serialized<S: serde::Serialize>(
    outgoing: &UnboundedSender<Message>,
    id: RequestId,
    result: &S,
) {
    match serde_json::to_value(result) {
        Ok(value) => send_result(outgoing, id, value),
        Err(e) => send_error(outgoing, id, &EngineError::from(e)),
    }
}

fn send_error(outgoing: &UnboundedSender<Message>, id: RequestId, err: &EngineError) {
    debug!(%id, code = err.code(), error = %err, "Answering with error");
    send_message(
        outgoing,
        Message::Response(Response::error(id, RpcError::from(err))),
    );
}
