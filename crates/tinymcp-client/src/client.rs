//! Client-side session engine.
//!
//! [`Client`] drives the handshake, correlates responses to in-flight
//! requests, answers server-initiated reversed calls through a
//! [`ClientHandler`], and exposes typed wrappers for the method surface.

use futures::channel::oneshot;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tinymcp_core::capability::{
    ClientCapabilities, ClientInfo, InitializeRequest, InitializeResult, ServerCapabilities,
    ServerInfo, PROTOCOL_VERSION,
};
use tinymcp_core::protocol::{Message, Notification, Request, RequestId, Response};
use tinymcp_core::types::{
    CallToolRequest, CallToolResult, GetPromptRequest, GetPromptResult, ListPromptsResult,
    ListResourcesResult, ListToolsResult, ProgressUpdate, Prompt, ReadResourceRequest,
    ReadResourceResult, Resource, ResourceContents, Tool,
};
use tinymcp_core::{EngineError, RpcError};
use tinymcp_transport::Transport;
use tracing::{debug, error, trace, warn};

// Runtime-agnostic lock for the correlation table.
use async_lock::RwLock;

use tokio::sync::mpsc;

use crate::handler::ClientHandler;

type Pending = Arc<RwLock<HashMap<RequestId, oneshot::Sender<Response>>>>;

/// A connected client session.
///
/// Construct one through [`ClientBuilder`](crate::ClientBuilder), which
/// performs the handshake. A background task owns the transport's receive
/// side: it routes responses to their waiting callers and delegates
/// reversed calls to the [`ClientHandler`].
pub struct Client<T: Transport, H: ClientHandler = crate::handler::NoOpHandler> {
    transport: Arc<T>,
    server_info: ServerInfo,
    server_caps: ServerCapabilities,
    instructions: Option<String>,
    client_info: ClientInfo,
    client_caps: ClientCapabilities,
    /// Ids start above the one spent on `initialize` and are never reused.
    next_id: AtomicU64,
    pending: Pending,
    handler: Arc<H>,
    outgoing_tx: mpsc::Sender<Message>,
    running: Arc<AtomicBool>,
    _background_handle: tokio::task::JoinHandle<()>,
}

impl<T: Transport + 'static, H: ClientHandler + 'static> Client<T, H> {
    pub(crate) fn with_handler(
        transport: T,
        init_result: InitializeResult,
        client_info: ClientInfo,
        client_caps: ClientCapabilities,
        handler: H,
    ) -> Self {
        let transport = Arc::new(transport);
        let pending: Pending = Arc::new(RwLock::new(HashMap::new()));
        let handler = Arc::new(handler);
        let running = Arc::new(AtomicBool::new(true));

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Message>(256);

        let background_handle = Self::spawn_message_router(
            Arc::clone(&transport),
            Arc::clone(&pending),
            Arc::clone(&handler),
            Arc::clone(&running),
            outgoing_rx,
        );

        let handler_clone = Arc::clone(&handler);
        tokio::spawn(async move {
            handler_clone.on_connected().await;
        });

        Self {
            transport,
            server_info: init_result.server_info,
            server_caps: init_result.capabilities,
            instructions: init_result.instructions,
            client_info,
            client_caps,
            next_id: AtomicU64::new(1),
            pending,
            handler,
            outgoing_tx,
            running,
            _background_handle: background_handle,
        }
    }

    /// Spawn the background task that owns the transport's receive side.
    fn spawn_message_router(
        transport: Arc<T>,
        pending: Pending,
        handler: Arc<H>,
        running: Arc<AtomicBool>,
        mut outgoing_rx: mpsc::Receiver<Message>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            debug!("starting client message router");

            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                tokio::select! {
                    Some(msg) = outgoing_rx.recv() => {
                        if let Err(e) = transport.send(msg).await {
                            error!(error = %e, "failed to send message");
                        }
                    }

                    result = transport.recv() => {
                        match result {
                            Ok(Some(message)) => {
                                Self::handle_incoming(message, &pending, &handler, &transport)
                                    .await;
                            }
                            Ok(None) => {
                                debug!("connection closed by server");
                                running.store(false, Ordering::SeqCst);
                                handler.on_disconnected().await;
                                break;
                            }
                            Err(e) => {
                                error!(error = %e, "transport error in message router");
                                running.store(false, Ordering::SeqCst);
                                handler.on_disconnected().await;
                                break;
                            }
                        }
                    }
                }
            }

            // Resume every waiter; their oneshot senders drop here.
            pending.write().await.clear();
            debug!("client message router stopped");
        })
    }

    async fn handle_incoming(
        message: Message,
        pending: &Pending,
        handler: &Arc<H>,
        transport: &Arc<T>,
    ) {
        match message {
            Message::Response(response) => Self::route_response(response, pending).await,
            Message::Request(request) => {
                Self::handle_server_request(request, handler, transport).await;
            }
            Message::Notification(notification) => {
                Self::handle_notification(notification, handler).await;
            }
        }
    }

    async fn route_response(response: Response, pending: &Pending) {
        let sender = pending.write().await.remove(&response.id);
        if let Some(sender) = sender {
            trace!(id = %response.id, "routing response to pending request");
            if sender.send(response).is_err() {
                warn!("pending request receiver dropped");
            }
        } else {
            warn!(id = %response.id, "response to unknown request id, dropping");
        }
    }

    /// Answer a reversed call by delegating to the handler.
    async fn handle_server_request(request: Request, handler: &Arc<H>, transport: &Arc<T>) {
        trace!(method = %request.method, "handling server request");

        let id = request.id.clone();
        let response = match request.method() {
            "sampling/createMessage" => match typed_params(&request) {
                Ok(params) => match handler.create_message(params).await {
                    Ok(result) => success_response(id, &result),
                    Err(e) => Response::error(id, RpcError::from(e)),
                },
                Err(e) => Response::error(id, e),
            },
            "elicitation/create" => match typed_params(&request) {
                Ok(params) => match handler.elicit(params).await {
                    Ok(result) => success_response(id, &result),
                    Err(e) => Response::error(id, RpcError::from(e)),
                },
                Err(e) => Response::error(id, e),
            },
            "ping" => Response::success(id, serde_json::json!({})),
            other => {
                warn!(method = %other, "unknown server request method");
                Response::error(id, RpcError::method_not_found(format!("unknown method '{other}'")))
            }
        };

        if let Err(e) = transport.send(Message::Response(response)).await {
            error!(error = %e, "failed to send response to server request");
        }
    }

    async fn handle_notification(notification: Notification, handler: &Arc<H>) {
        match notification.method() {
            "notifications/progress" => {
                let Some(params) = notification.params else {
                    warn!("progress notification without params, dropping");
                    return;
                };
                match serde_json::from_value::<ProgressUpdate>(params) {
                    Ok(update) => handler.on_progress(update).await,
                    Err(e) => warn!(error = %e, "malformed progress notification, dropping"),
                }
            }
            "notifications/cancelled" => {
                // The server retracted a reversed call. The handler may
                // still answer; the server drops the late response.
                debug!(params = ?notification.params, "server cancelled a request");
            }
            other => {
                trace!(method = %other, "unhandled notification, ignoring");
            }
        }
    }

    /// The server's identity from the handshake.
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// The server's declared capabilities.
    pub const fn server_capabilities(&self) -> &ServerCapabilities {
        &self.server_caps
    }

    /// This client's identity.
    pub const fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    /// This client's declared capabilities.
    pub const fn client_capabilities(&self) -> &ClientCapabilities {
        &self.client_caps
    }

    /// Usage instructions from the server, if any.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Whether the session is still up.
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// List the server's tools.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, EngineError> {
        self.ensure_capability("tools", self.server_caps.has_tools())?;
        let result: ListToolsResult = self.request("tools/list", None).await?;
        Ok(result.tools)
    }

    /// Call a tool by name.
    ///
    /// Progress updates for streaming tools are delivered to the handler's
    /// `on_progress` while this future is pending.
    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, EngineError> {
        self.ensure_capability("tools", self.server_caps.has_tools())?;
        let request = CallToolRequest {
            name: name.into(),
            arguments: Some(arguments),
        };
        self.request("tools/call", Some(serde_json::to_value(request)?))
            .await
    }

    /// List the server's resources.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, EngineError> {
        self.ensure_capability("resources", self.server_caps.has_resources())?;
        let result: ListResourcesResult = self.request("resources/list", None).await?;
        Ok(result.resources)
    }

    /// Read a resource by locator.
    pub async fn read_resource(
        &self,
        uri: impl Into<String>,
    ) -> Result<Vec<ResourceContents>, EngineError> {
        self.ensure_capability("resources", self.server_caps.has_resources())?;
        let request = ReadResourceRequest { uri: uri.into() };
        let result: ReadResourceResult = self
            .request("resources/read", Some(serde_json::to_value(request)?))
            .await?;
        Ok(result.contents)
    }

    /// List the server's prompts.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, EngineError> {
        self.ensure_capability("prompts", self.server_caps.has_prompts())?;
        let result: ListPromptsResult = self.request("prompts/list", None).await?;
        Ok(result.prompts)
    }

    /// Fetch a prompt by name, optionally with template arguments.
    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<GetPromptResult, EngineError> {
        self.ensure_capability("prompts", self.server_caps.has_prompts())?;
        let request = GetPromptRequest {
            name: name.into(),
            arguments,
        };
        self.request("prompts/get", Some(serde_json::to_value(request)?))
            .await
    }

    /// Probe the server for liveness.
    pub async fn ping(&self) -> Result<(), EngineError> {
        let _: serde_json::Value = self.request("ping", None).await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<(), EngineError> {
        debug!("closing client connection");
        self.running.store(false, Ordering::SeqCst);
        self.handler.on_disconnected().await;
        self.transport
            .close()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Send a request and suspend until its response arrives.
    async fn request<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<R, EngineError> {
        if !self.is_connected() {
            return Err(EngineError::SessionClosed);
        }

        let id = self.next_request_id();
        let request = match params {
            Some(params) => Request::with_params(method, id.clone(), params),
            None => Request::new(method, id.clone()),
        };

        trace!(%id, method, "sending request");

        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(id.clone(), tx);

        if self
            .outgoing_tx
            .send(Message::Request(request))
            .await
            .is_err()
        {
            self.pending.write().await.remove(&id);
            return Err(EngineError::SessionClosed);
        }

        // Sender dropped means the router stopped before answering.
        let response = rx.await.map_err(|_| EngineError::SessionClosed)?;
        let result = response.into_result()?;
        Ok(serde_json::from_value(result)?)
    }

    fn ensure_capability(&self, name: &str, declared: bool) -> Result<(), EngineError> {
        if declared {
            Ok(())
        } else {
            Err(EngineError::CapabilityNotSupported {
                capability: name.to_string(),
            })
        }
    }
}

fn typed_params<P: DeserializeOwned>(request: &Request) -> Result<P, RpcError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| RpcError::invalid_params(format!("missing params for '{}'", request.method)))?;
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn success_response<S: serde::Serialize>(id: RequestId, result: &S) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => {
            error!(error = %e, "failed to serialize reversed-call result");
            Response::error(id, RpcError::internal_error("internal error"))
        }
    }
}

/// Perform the handshake on a fresh transport.
///
/// Sends `initialize` (id 0), waits for the result, then sends
/// `notifications/initialized` to activate the session.
pub(crate) async fn initialize<T: Transport>(
    transport: &T,
    client_info: &ClientInfo,
    capabilities: &ClientCapabilities,
) -> Result<InitializeResult, EngineError> {
    debug!(protocol_version = %PROTOCOL_VERSION, "initializing connection");

    let request = InitializeRequest::new(client_info.clone(), capabilities.clone());
    let init_request = Request::with_params(
        "initialize",
        RequestId::Number(0),
        serde_json::to_value(&request)?,
    );
    transport
        .send(Message::Request(init_request))
        .await
        .map_err(|e| EngineError::transport(format!("failed to send initialize: {e}")))?;

    let response = loop {
        match transport.recv().await {
            Ok(Some(Message::Response(r))) if r.id == RequestId::Number(0) => break r,
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(EngineError::transport("connection closed during handshake"));
            }
            Err(e) => {
                return Err(EngineError::transport(format!(
                    "transport error during handshake: {e}"
                )));
            }
        }
    };

    let result: InitializeResult = serde_json::from_value(response.into_result()?)?;

    if result.protocol_version != PROTOCOL_VERSION {
        warn!(
            server_version = %result.protocol_version,
            our_version = %PROTOCOL_VERSION,
            "server speaks a different protocol version, proceeding anyway"
        );
    }

    debug!(
        server = %result.server_info.name,
        server_version = %result.server_info.version,
        "handshake complete"
    );

    transport
        .send(Message::Notification(Notification::new(
            "notifications/initialized",
        )))
        .await
        .map_err(|e| EngineError::transport(format!("failed to send initialized: {e}")))?;

    Ok(result)
}
