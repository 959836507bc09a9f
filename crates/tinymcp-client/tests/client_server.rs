//! Full client-against-server sessions over an in-memory transport.

use std::future::Future;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tinymcp_client::{ClientBuilder, ClientHandler};
use tinymcp_core::error::codes;
use tinymcp_core::types::{
    CallToolResult, CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult,
    GetPromptResult, ProgressUpdate, Prompt, PromptArgument, PromptMessage, ReadResourceResult,
    Resource, ResourceContents, Tool,
};
use tinymcp_core::EngineError;
use tinymcp_server::{Arguments, Server, ToolContext};
use tinymcp_transport::MemoryTransport;

fn protein_server() -> Server {
    Server::builder("protein-server", "1.0.0")
        .instructions("Query the protein database")
        .resource(
            Resource::new("protein://proteins", "Protein Database")
                .mime_type("application/json"),
            |uri: String| async move {
                Ok::<_, EngineError>(ReadResourceResult {
                    contents: vec![ResourceContents::text(
                        uri,
                        r#"{"P53_HUMAN":{"organism":"Homo sapiens"}}"#,
                    )
                    .mime_type("application/json")],
                })
            },
        )
        .unwrap()
        .tool(
            Tool::new("find_protein").with_reversed_calls(),
            |args: Arguments, ctx: ToolContext| async move {
                let name = args
                    .as_ref()
                    .and_then(|a| a.get("name"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| EngineError::invalid_params("tools/call", "missing name"))?
                    .to_lowercase();
                if name == "p53" {
                    let outcome = ctx
                        .reversed
                        .elicit(
                            ElicitRequest::new("Multiple proteins match 'p53'. Please specify:")
                                .choice("P53_HUMAN")
                                .choice("P53_MOUSE"),
                        )
                        .await?;
                    return Ok(match outcome.choice {
                        Some(choice) => CallToolResult::text(format!("Found protein {choice}")),
                        None => CallToolResult::error("selection declined"),
                    });
                }
                Ok(CallToolResult::text("Found protein P53_HUMAN"))
            },
        )
        .unwrap()
        .tool(
            Tool::new("analyze_protein_stream").streaming(),
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
            Tool::new("get_protein_hypothesis").with_reversed_calls(),
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
        .prompt(
            Prompt::new("protein_analysis").argument(PromptArgument::required("protein_id")),
            |args: Arguments| async move {
                let protein_id = args
                    .as_ref()
                    .and_then(|a| a.get("protein_id"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                Ok::<_, EngineError>(GetPromptResult {
                    description: None,
                    messages: vec![PromptMessage::user(format!(
                        "Analyze the protein {protein_id}"
                    ))],
                })
            },
        )
        .unwrap()
        .build()
}

/// Answers reversed calls like the workshop client: picks the human
/// variant, returns a canned completion, and records progress.
#[derive(Clone, Default)]
struct WorkshopHandler {
    progress: Arc<Mutex<Vec<ProgressUpdate>>>,
}

impl ClientHandler for WorkshopHandler {
    fn create_message(
        &self,
        _request: CreateMessageRequest,
    ) -> impl Future<Output = Result<CreateMessageResult, EngineError>> + Send {
        async {
            Ok(CreateMessageResult::text(
                "demo-model",
                "p53 likely regulates apoptosis",
            ))
        }
    }

    fn elicit(
        &self,
        request: ElicitRequest,
    ) -> impl Future<Output = Result<ElicitResult, EngineError>> + Send {
        async move {
            let choice = request
                .choices
                .first()
                .cloned()
                .ok_or_else(|| EngineError::invalid_params("elicitation/create", "no choices"))?;
            Ok(ElicitResult::accept(choice))
        }
    }

    fn on_progress(&self, update: ProgressUpdate) -> impl Future<Output = ()> + Send {
        let progress = Arc::clone(&self.progress);
        async move {
            progress.lock().unwrap().push(update);
        }
    }
}

fn spawn_server() -> MemoryTransport {
    let server = protein_server();
    let (client_side, server_side) = MemoryTransport::pair();
    tokio::spawn(async move { server.serve(server_side).await });
    client_side
}

#[tokio::test]
async fn handshake_exposes_server_identity() {
    let transport = spawn_server();
    let client = ClientBuilder::new()
        .name("workshop-client")
        .version("1.0.0")
        .build(transport)
        .await
        .unwrap();

    assert_eq!(client.server_info().name, "protein-server");
    assert_eq!(client.instructions(), Some("Query the protein database"));
    assert!(client.server_capabilities().has_tools());
    assert!(client.server_capabilities().has_resources());
    assert!(client.server_capabilities().has_prompts());
    assert!(client.is_connected());
}

#[tokio::test]
async fn typed_operations_round_trip() {
    let transport = spawn_server();
    let client = ClientBuilder::new().build(transport).await.unwrap();

    let tools = client.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["find_protein", "analyze_protein_stream", "get_protein_hypothesis"]
    );

    let result = client
        .call_tool("find_protein", serde_json::json!({"name": "TP53"}))
        .await
        .unwrap();
    assert_eq!(result.content[0].as_text(), Some("Found protein P53_HUMAN"));

    let contents = client.read_resource("protein://proteins").await.unwrap();
    assert!(contents[0].text.contains("P53_HUMAN"));

    let prompt = client
        .get_prompt(
            "protein_analysis",
            Some(
                serde_json::json!({"protein_id": "P53_HUMAN"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
        )
        .await
        .unwrap();
    assert_eq!(prompt.messages.len(), 1);

    client.ping().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn server_errors_surface_as_peer_errors() {
    let transport = spawn_server();
    let client = ClientBuilder::new().build(transport).await.unwrap();

    let err = client.read_resource("protein://nonexistent").await.unwrap_err();
    match err {
        EngineError::Peer { code, .. } => assert_eq!(code, codes::RESOURCE_NOT_FOUND),
        other => panic!("expected peer error, got {other}"),
    }

    let err = client
        .call_tool("nonexistent_tool", serde_json::json!({}))
        .await
        .unwrap_err();
    match err {
        EngineError::Peer { code, .. } => assert_eq!(code, codes::METHOD_NOT_FOUND),
        other => panic!("expected peer error, got {other}"),
    }
}

#[tokio::test]
async fn elicitation_answers_through_the_handler() {
    let transport = spawn_server();
    let client = ClientBuilder::new()
        .with_sampling()
        .with_elicitation()
        .build_with_handler(transport, WorkshopHandler::default())
        .await
        .unwrap();

    let result = client
        .call_tool("find_protein", serde_json::json!({"name": "p53"}))
        .await
        .unwrap();
    assert_eq!(result.content[0].as_text(), Some("Found protein P53_HUMAN"));
}

#[tokio::test]
async fn sampling_answers_through_the_handler() {
    let transport = spawn_server();
    let client = ClientBuilder::new()
        .with_sampling()
        .with_elicitation()
        .build_with_handler(transport, WorkshopHandler::default())
        .await
        .unwrap();

    let result = client
        .call_tool("get_protein_hypothesis", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(
        result.content[0].as_text(),
        Some("p53 likely regulates apoptosis")
    );
}

#[tokio::test]
async fn progress_reaches_the_handler_before_the_result() {
    let transport = spawn_server();
    let handler = WorkshopHandler::default();
    let progress = Arc::clone(&handler.progress);
    let client = ClientBuilder::new()
        .build_with_handler(transport, handler)
        .await
        .unwrap();

    let result = client
        .call_tool(
            "analyze_protein_stream",
            serde_json::json!({"protein_id": "P53_HUMAN"}),
        )
        .await
        .unwrap();
    assert_eq!(result.content[0].as_text(), Some("analysis complete"));

    // All updates were delivered before the response was routed.
    let updates = progress.lock().unwrap();
    assert_eq!(updates.len(), 4);
    for (expected, update) in updates.iter().enumerate() {
        assert_eq!(update.sequence, expected as u64);
        assert_eq!(update.total, Some(3));
    }
}

#[tokio::test]
async fn undeclared_client_capability_fails_the_reversed_call() {
    let transport = spawn_server();
    // No sampling declared, so the broker rejects before any traffic.
    let client = ClientBuilder::new().build(transport).await.unwrap();

    let err = client
        .call_tool("get_protein_hypothesis", serde_json::json!({}))
        .await
        .unwrap_err();
    match err {
        EngineError::Peer { code, .. } => assert_eq!(code, codes::TOOL_EXECUTION_FAILED),
        other => panic!("expected peer error, got {other}"),
    }
}

#[tokio::test]
async fn client_gates_calls_on_server_capabilities() {
    let server = Server::builder("bare-server", "1.0.0").build();
    let (client_side, server_side) = MemoryTransport::pair();
    tokio::spawn(async move { server.serve(server_side).await });

    let client = ClientBuilder::new().build(client_side).await.unwrap();
    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, EngineError::CapabilityNotSupported { .. }));
}
