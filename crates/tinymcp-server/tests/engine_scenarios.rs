//! End-to-end session scenarios over an in-memory transport.
//!
//! The client side is driven by hand (raw messages) so these tests pin
//! the wire behavior of the engine, not the convenience client.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tinymcp_core::capability::{ClientCapabilities, ClientInfo, InitializeRequest};
use tinymcp_core::error::codes;
use tinymcp_core::protocol::{Message, Notification, Request, RequestId, Response};
use tinymcp_core::types::{
    CallToolResult, CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult,
    GetPromptResult, ProgressUpdate, Prompt, PromptArgument, PromptMessage, ReadResourceResult,
    Resource, ResourceContents, Tool,
};
use tinymcp_core::EngineError;
use tinymcp_server::{Arguments, BrokerConfig, Server, ToolContext};
use tinymcp_transport::{MemoryTransport, Transport};

const PROTEIN_DB: &str = r#"{"P53_HUMAN":{"organism":"Homo sapiens"},"P53_MOUSE":{"organism":"Mus musculus"}}"#;

fn protein_server(broker: BrokerConfig) -> Server {
    protein_server_with_probe(broker, None)
}

fn protein_server_with_probe(
    broker: BrokerConfig,
    elicit_probe: Option<tokio::sync::mpsc::UnboundedSender<Result<ElicitResult, String>>>,
) -> Server {
    Server::builder("protein-server", "1.0.0")
        .instructions("Query the protein database")
        .broker_config(broker)
        .resource(
            Resource::new("protein://proteins", "Protein Database")
                .mime_type("application/json"),
            |uri: String| async move {
                Ok::<_, EngineError>(ReadResourceResult {
                    contents: vec![
                        ResourceContents::text(uri, PROTEIN_DB).mime_type("application/json"),
                    ],
                })
            },
        )
        .unwrap()
        .tool(
            Tool::new("find_protein")
                .description("Look up a protein by name")
                .with_reversed_calls(),
            move |args: Arguments, ctx: ToolContext| {
                let probe = elicit_probe.clone();
                async move {
                    let name = args
                        .as_ref()
                        .and_then(|a| a.get("name"))
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            EngineError::invalid_params("tools/call", "missing name")
                        })?
                        .to_lowercase();

                    if name == "p53" {
                        let outcome = ctx
                            .reversed
                            .elicit(
                                ElicitRequest::new(
                                    "Multiple proteins match 'p53'. Please specify:",
                                )
                                .choice("P53_HUMAN")
                                .choice("P53_MOUSE"),
                            )
                            .await;
                        if let Some(probe) = probe {
                            let _ = probe.send(
                                outcome.as_ref().cloned().map_err(ToString::to_string),
                            );
                        }
                        let outcome = outcome?;
                        return Ok(match outcome.choice {
                            Some(choice) => {
                                CallToolResult::text(format!("Found protein {choice}"))
                            }
                            None => CallToolResult::error("selection declined"),
                        });
                    }
                    if name == "tp53" {
                        Ok(CallToolResult::text("Found protein P53_HUMAN"))
                    } else {
                        Ok(CallToolResult::error("No proteins found"))
                    }
                }
            },
        )
        .unwrap()
        .tool(
            Tool::new("analyze_protein_stream")
                .description("Stream protein analysis")
                .streaming(),
            |_args: Arguments, ctx: ToolContext| async move {
                for step in 0..=3u64 {
                    let message = format!("step {step} of 3");
                    ctx.progress.emit(step, Some(3), Some(&message));
                }
                Ok::<_, EngineError>(CallToolResult::text("analysis complete"))
            },
        )
        .unwrap()
        .tool(
            Tool::new("get_protein_hypothesis")
                .description("Ask the client's model for a hypothesis")
                .with_reversed_calls(),
            |_args: Arguments, ctx: ToolContext| async move {
                let completion = ctx
                    .reversed
                    .create_message(CreateMessageRequest::simple(
                        "Generate a hypothesis about p53",
                        256,
                    ))
                    .await?;
                Ok(CallToolResult::text(
                    completion.as_text().unwrap_or_default().to_string(),
                ))
            },
        )
        .unwrap()
        .tool(
            Tool::new("slow_echo").description("Echo after a delay"),
            |args: Arguments, _ctx: ToolContext| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let text = args
                    .as_ref()
                    .and_then(|a| a.get("text"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                Ok::<_, EngineError>(CallToolResult::text(text))
            },
        )
        .unwrap()
        .tool(
            Tool::new("wait_for_cancel").description("Block until cancelled"),
            |_args: Arguments, ctx: ToolContext| async move {
                ctx.cancel.cancelled().await;
                Err(EngineError::cancelled("wait_for_cancel"))
            },
        )
        .unwrap()
        .tool(
            Tool::new("quiet_lookup").description("Lookup with no declared facilities"),
            |_args: Arguments, ctx: ToolContext| async move {
                ctx.progress.emit(0, Some(1), Some("starting"));
                let outcome = ctx
                    .reversed
                    .elicit(ElicitRequest::new("which?").choice("P53_HUMAN"))
                    .await?;
                Ok::<_, EngineError>(CallToolResult::text(
                    outcome.choice.unwrap_or_default(),
                ))
            },
        )
        .unwrap()
        .prompt(
            Prompt::new("protein_analysis")
                .description("Generate comprehensive protein analysis")
                .argument(PromptArgument::required("protein_id")),
            |args: Arguments| async move {
                let protein_id = args
                    .as_ref()
                    .and_then(|a| a.get("protein_id"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                Ok::<_, EngineError>(GetPromptResult {
                    description: Some(format!("Analysis of {protein_id}")),
                    messages: vec![PromptMessage::user(format!(
                        "Analyze the protein {protein_id}"
                    ))],
                })
            },
        )
        .unwrap()
        .build()
}

fn spawn_server(
    server: Server,
) -> (
    MemoryTransport,
    tokio::task::JoinHandle<Result<(), EngineError>>,
) {
    let (client, server_side) = MemoryTransport::pair();
    let handle = tokio::spawn(async move { server.serve(server_side).await });
    (client, handle)
}

async fn recv_msg(client: &MemoryTransport) -> Message {
    client.recv().await.unwrap().expect("transport closed early")
}

async fn recv_response_for(client: &MemoryTransport, id: &RequestId) -> Response {
    loop {
        if let Message::Response(response) = recv_msg(client).await {
            assert_eq!(&response.id, id, "response correlates to the wrong request");
            return response;
        }
    }
}

async fn send_request(
    client: &MemoryTransport,
    id: u64,
    method: &'static str,
    params: Option<serde_json::Value>,
) {
    let request = match params {
        Some(params) => Request::with_params(method, RequestId::Number(id), params),
        None => Request::new(method, RequestId::Number(id)),
    };
    client.send(Message::Request(request)).await.unwrap();
}

async fn call(
    client: &MemoryTransport,
    id: u64,
    method: &'static str,
    params: Option<serde_json::Value>,
) -> Response {
    send_request(client, id, method, params).await;
    recv_response_for(client, &RequestId::Number(id)).await
}

async fn handshake(client: &MemoryTransport) {
    let init = InitializeRequest::new(
        ClientInfo::new("workshop-client", "1.0.0"),
        ClientCapabilities::new().with_sampling().with_elicitation(),
    );
    let response = call(
        client,
        1,
        "initialize",
        Some(serde_json::to_value(&init).unwrap()),
    )
    .await;
    let result = response.into_result().unwrap();
    assert_eq!(result["serverInfo"]["name"], "protein-server");
    assert_eq!(result["instructions"], "Query the protein database");

    client
        .send(Message::Notification(Notification::new(
            "notifications/initialized",
        )))
        .await
        .unwrap();
}

// Scenario: handshake then a successful tool call.
#[tokio::test]
async fn initialize_then_tool_call_succeeds() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    let response = call(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "find_protein", "arguments": {"name": "TP53"}})),
    )
    .await;
    let result = response.into_result().unwrap();
    assert_eq!(result["content"][0]["text"], "Found protein P53_HUMAN");
    assert!(result.get("isError").is_none());
}

// Scenario: any request before the handshake is rejected.
#[tokio::test]
async fn requests_before_handshake_are_rejected() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));

    let response = call(&client, 1, "tools/list", None).await;
    let err = response.into_result().unwrap_err();
    assert_eq!(err.code, codes::NOT_INITIALIZED);
}

#[tokio::test]
async fn second_initialize_is_an_invalid_request() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    let init = InitializeRequest::new(
        ClientInfo::new("workshop-client", "1.0.0"),
        ClientCapabilities::new(),
    );
    let response = call(
        &client,
        2,
        "initialize",
        Some(serde_json::to_value(&init).unwrap()),
    )
    .await;
    assert_eq!(response.into_result().unwrap_err().code, codes::INVALID_REQUEST);
}

#[tokio::test]
async fn listings_are_deterministic_and_insertion_ordered() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    for id in 2..4u64 {
        let result = call(&client, id, "tools/list", None)
            .await
            .into_result()
            .unwrap();
        let names: Vec<_> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "find_protein",
                "analyze_protein_stream",
                "get_protein_hypothesis",
                "slow_echo",
                "wait_for_cancel",
                "quiet_lookup",
            ]
        );
    }

    let result = call(&client, 4, "resources/list", None)
        .await
        .into_result()
        .unwrap();
    assert_eq!(result["resources"][0]["uri"], "protein://proteins");
}

#[tokio::test]
async fn resource_read_round_trip_and_miss() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    let result = call(
        &client,
        2,
        "resources/read",
        Some(serde_json::json!({"uri": "protein://proteins"})),
    )
    .await
    .into_result()
    .unwrap();
    assert_eq!(result["contents"][0]["uri"], "protein://proteins");
    assert_eq!(result["contents"][0]["mimeType"], "application/json");

    let err = call(
        &client,
        3,
        "resources/read",
        Some(serde_json::json!({"uri": "protein://nonexistent"})),
    )
    .await
    .into_result()
    .unwrap_err();
    assert_eq!(err.code, codes::RESOURCE_NOT_FOUND);
}

#[tokio::test]
async fn prompt_get_round_trip_and_miss() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    let result = call(
        &client,
        2,
        "prompts/get",
        Some(serde_json::json!({"name": "protein_analysis", "arguments": {"protein_id": "P53_HUMAN"}})),
    )
    .await
    .into_result()
    .unwrap();
    assert_eq!(result["description"], "Analysis of P53_HUMAN");
    assert_eq!(result["messages"][0]["role"], "user");

    let err = call(
        &client,
        3,
        "prompts/get",
        Some(serde_json::json!({"name": "nonexistent"})),
    )
    .await
    .into_result()
    .unwrap_err();
    assert_eq!(err.code, codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn unknown_methods_and_tools_answer_method_not_found() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    let err = call(&client, 2, "tools/destroy", None)
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.code, codes::METHOD_NOT_FOUND);

    let err = call(
        &client,
        3,
        "tools/call",
        Some(serde_json::json!({"name": "nonexistent_tool"})),
    )
    .await
    .into_result()
    .unwrap_err();
    assert_eq!(err.code, codes::METHOD_NOT_FOUND);
}

// A tool that declared neither facility: its progress goes nowhere and
// its reversed call is rejected before reaching the wire.
#[tokio::test]
async fn undeclared_tool_facilities_stay_off_the_wire() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "quiet_lookup", "arguments": {}})),
    )
    .await;

    // The very next message is the failure; no progress notification and
    // no elicitation request precede it.
    let response = match recv_msg(&client).await {
        Message::Response(response) => response,
        other => panic!("expected the error response first, got {other:?}"),
    };
    assert_eq!(response.id, RequestId::Number(2));
    let err = response.into_result().unwrap_err();
    assert_eq!(err.code, codes::TOOL_EXECUTION_FAILED);
    assert_eq!(err.data.unwrap()["cause"]["code"], codes::METHOD_NOT_FOUND);
}

// Scenario: progress updates arrive in order, gap-free, strictly before
// the terminal response.
#[tokio::test]
async fn streaming_progress_precedes_the_terminal_response() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "analyze_protein_stream", "arguments": {"protein_id": "P53_HUMAN"}})),
    )
    .await;

    let mut updates: Vec<ProgressUpdate> = Vec::new();
    let response = loop {
        match recv_msg(&client).await {
            Message::Notification(n) => {
                assert_eq!(n.method.as_ref(), "notifications/progress");
                updates.push(serde_json::from_value(n.params.unwrap()).unwrap());
            }
            Message::Response(response) => break response,
            Message::Request(_) => panic!("unexpected server request"),
        }
    };

    assert_eq!(updates.len(), 4);
    for (expected, update) in updates.iter().enumerate() {
        assert_eq!(update.sequence, expected as u64);
        assert_eq!(update.progress, expected as u64);
        assert_eq!(update.total, Some(3));
    }
    let result = response.into_result().unwrap();
    assert_eq!(result["content"][0]["text"], "analysis complete");
}

// Scenario: mid-call elicitation round trip.
#[tokio::test]
async fn elicitation_round_trip_disambiguates_the_call() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "find_protein", "arguments": {"name": "p53"}})),
    )
    .await;

    // The reversed request arrives while the outer call is suspended.
    let reversed = loop {
        if let Message::Request(request) = recv_msg(&client).await {
            break request;
        }
    };
    assert_eq!(reversed.method.as_ref(), "elicitation/create");
    assert!(reversed.id.is_s2c());
    let params = reversed.params.as_ref().unwrap();
    assert_eq!(params["choices"][0], "P53_HUMAN");

    let answer = serde_json::to_value(ElicitResult::accept("P53_HUMAN")).unwrap();
    client
        .send(Message::Response(Response::success(reversed.id, answer)))
        .await
        .unwrap();

    let result = recv_response_for(&client, &RequestId::Number(2))
        .await
        .into_result()
        .unwrap();
    assert_eq!(result["content"][0]["text"], "Found protein P53_HUMAN");
}

// Scenario: mid-call sampling round trip.
#[tokio::test]
async fn sampling_round_trip_feeds_the_tool_result() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "get_protein_hypothesis"})),
    )
    .await;

    let reversed = loop {
        if let Message::Request(request) = recv_msg(&client).await {
            break request;
        }
    };
    assert_eq!(reversed.method.as_ref(), "sampling/createMessage");
    let params = reversed.params.as_ref().unwrap();
    assert_eq!(params["maxTokens"], 256);

    let completion = CreateMessageResult::text("demo-model", "p53 likely regulates apoptosis");
    client
        .send(Message::Response(Response::success(
            reversed.id,
            serde_json::to_value(&completion).unwrap(),
        )))
        .await
        .unwrap();

    let result = recv_response_for(&client, &RequestId::Number(2))
        .await
        .into_result()
        .unwrap();
    assert_eq!(
        result["content"][0]["text"],
        "p53 likely regulates apoptosis"
    );
}

// Scenario: an unanswered reversed call times out and fails the outer
// call; it never hangs.
#[tokio::test(start_paused = true)]
async fn unanswered_sampling_times_out_and_fails_the_outer_call() {
    let broker = BrokerConfig {
        sampling_timeout: Duration::from_secs(2),
        ..BrokerConfig::default()
    };
    let (client, _server) = spawn_server(protein_server(broker));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "get_protein_hypothesis"})),
    )
    .await;

    // Read the reversed request, then never answer it.
    let reversed = loop {
        if let Message::Request(request) = recv_msg(&client).await {
            break request;
        }
    };
    assert_eq!(reversed.method.as_ref(), "sampling/createMessage");

    // Timeout retracts the reversed call, then the outer call fails.
    let retraction = recv_msg(&client).await;
    match retraction {
        Message::Notification(n) => assert_eq!(n.method.as_ref(), "notifications/cancelled"),
        other => panic!("expected cancellation, got {other:?}"),
    }

    let err = recv_response_for(&client, &RequestId::Number(2))
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.code, codes::TOOL_EXECUTION_FAILED);
    let data = err.data.unwrap();
    assert_eq!(data["cause"]["code"], codes::REVERSED_CALL_TIMED_OUT);
}

// Scenario: two interleaved calls complete independently, out of
// submission order, with no cross-talk.
#[tokio::test(start_paused = true)]
async fn concurrent_calls_complete_out_of_order_without_crosstalk() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        10,
        "tools/call",
        Some(serde_json::json!({"name": "slow_echo", "arguments": {"text": "slow"}})),
    )
    .await;
    send_request(
        &client,
        11,
        "tools/call",
        Some(serde_json::json!({"name": "find_protein", "arguments": {"name": "TP53"}})),
    )
    .await;

    let first = match recv_msg(&client).await {
        Message::Response(r) => r,
        other => panic!("expected response, got {other:?}"),
    };
    let second = match recv_msg(&client).await {
        Message::Response(r) => r,
        other => panic!("expected response, got {other:?}"),
    };

    // The fast call overtakes the slow one.
    assert_eq!(first.id, RequestId::Number(11));
    assert_eq!(second.id, RequestId::Number(10));
    assert_eq!(
        first.into_result().unwrap()["content"][0]["text"],
        "Found protein P53_HUMAN"
    );
    assert_eq!(second.into_result().unwrap()["content"][0]["text"], "slow");
}

#[tokio::test]
async fn request_ids_stay_unique_across_thousands_of_calls() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    for id in 2..2002u64 {
        let response = call(&client, id, "ping", None).await;
        assert!(response.is_success());
    }

    // Reusing any completed id is a protocol error.
    let response = call(&client, 500, "ping", None).await;
    assert_eq!(response.into_result().unwrap_err().code, codes::INVALID_REQUEST);
}

#[tokio::test]
async fn stray_messages_never_kill_the_session() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    // Response to nothing we were asked: logged and dropped.
    client
        .send(Message::Response(Response::success(
            RequestId::String("s2c:999".to_string()),
            serde_json::json!({}),
        )))
        .await
        .unwrap();

    // Unknown notification: ignored.
    client
        .send(Message::Notification(Notification::new(
            "notifications/experimental/unknown",
        )))
        .await
        .unwrap();

    let response = call(&client, 2, "ping", None).await;
    assert!(response.is_success());
}

#[tokio::test]
async fn cancelled_call_is_suppressed_and_session_continues() {
    let (client, _server) = spawn_server(protein_server(BrokerConfig::default()));
    handshake(&client).await;

    send_request(
        &client,
        2,
        "tools/call",
        Some(serde_json::json!({"name": "wait_for_cancel"})),
    )
    .await;
    client
        .send(Message::Notification(Notification::with_params(
            "notifications/cancelled",
            serde_json::json!({"requestId": 2, "reason": "user changed their mind"}),
        )))
        .await
        .unwrap();

    // The cancelled call produces no response; the next response on the
    // wire belongs to the ping.
    let response = call(&client, 3, "ping", None).await;
    assert_eq!(response.id, RequestId::Number(3));
    assert!(response.is_success());
}

// Scenario: closing a session with reversed calls in flight resumes
// every suspended handler with a session-closed failure.
#[tokio::test]
async fn session_close_fails_all_pending_reversed_calls() {
    let (probe_tx, mut probe_rx) = tokio::sync::mpsc::unbounded_channel();
    let (client, server_handle) = spawn_server(protein_server_with_probe(
        BrokerConfig::default(),
        Some(probe_tx),
    ));
    handshake(&client).await;

    let n = 5u64;
    for id in 2..2 + n {
        send_request(
            &client,
            id,
            "tools/call",
            Some(serde_json::json!({"name": "find_protein", "arguments": {"name": "p53"}})),
        )
        .await;
    }

    // Wait until every reversed call is on the wire, then close.
    for _ in 0..n {
        let msg = recv_msg(&client).await;
        assert!(msg.is_request());
    }
    client.close().await.unwrap();

    assert!(server_handle.await.unwrap().is_ok());

    // Every suspended handler resumes with a session-closed failure.
    for _ in 0..n {
        let outcome = probe_rx.recv().await.expect("handler never resumed");
        assert_eq!(outcome.unwrap_err(), "session closed");
    }
}
