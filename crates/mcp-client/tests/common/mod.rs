use mcp_client::{
    transport::mock::{MockServer, MockTransport, Sent},
    Address, Client, ConnectionState, Transport,
};
use mcp_types::{ErrorCode, JsonrpcError, JsonrpcMessage, JsonrpcRequest, JsonrpcResponse, McpError};
use serde_json::{json, Value};

pub fn address() -> Address {
    Address::new("localhost", 8123)
}

pub fn tool_text(text: &str) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

pub fn text_contents(uri: &str, text: &str) -> Value {
    json!({ "contents": [{ "uri": uri, "mimeType": "application/json", "text": text }] })
}

/// Name of the tool a sent `tools/call` targets.
pub fn tool_name(sent: &Sent) -> String {
    sent.request()
        .and_then(|request| request.params.as_ref())
        .and_then(|params| params.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// A small fixed server: one schema resource, an `echo` tool and a `fail`
/// tool that reports its failure in-band.
pub fn fixture(_server_id: &str, request: &JsonrpcRequest) -> Option<JsonrpcMessage> {
    let id = request.id.clone();
    let params = request.params.clone().unwrap_or_default();

    let reply: JsonrpcMessage = match request.method.as_str() {
        "resources/read" => {
            let uri = params.get("uri").and_then(Value::as_str).unwrap_or_default();
            match uri {
                "persona://schema" => {
                    JsonrpcResponse::new(id, text_contents(uri, r#"{"type": "object"}"#)).into()
                }
                "persona://empty" => JsonrpcResponse::new(id, json!({ "contents": [] })).into(),
                "persona://elsewhere" => {
                    JsonrpcResponse::new(id, text_contents("persona://other", "{}")).into()
                }
                "persona://plain" => {
                    JsonrpcResponse::new(id, text_contents(uri, "not json at all")).into()
                }
                _ => JsonrpcError::new(
                    id,
                    McpError::new(ErrorCode::ResourceNotFound, format!("Resource not found: {uri}")),
                )
                .into(),
            }
        }
        "tools/call" => {
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            match name {
                "echo" => JsonrpcResponse::new(id, tool_text(&arguments.to_string())).into(),
                "fail" => JsonrpcResponse::new(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": "Error: name is required" }],
                        "isError": true,
                    }),
                )
                .into(),
                _ => JsonrpcError::new(
                    id,
                    McpError::new(ErrorCode::MethodNotFound, format!("Unknown tool: {name}")),
                )
                .into(),
            }
        }
        "tools/list" => JsonrpcResponse::new(
            id,
            json!({
                "tools": [{
                    "name": "echo",
                    "description": "Echo the arguments back",
                    "inputSchema": { "type": "object" },
                }]
            }),
        )
        .into(),
        "initialize" => JsonrpcResponse::new(
            id,
            json!({
                "capabilities": { "resources": {}, "tools": {} },
                "protocolVersion": "2024-11-05",
                "serverInfo": { "name": "persona-server", "version": "1.0.0" },
            }),
        )
        .into(),
        "ping" => JsonrpcResponse::new(id, json!({})).into(),
        _ => return None,
    };

    Some(reply)
}

/// A connected client whose requests are answered by [`fixture`].
pub async fn fixture_client() -> (Client<MockTransport>, MockServer) {
    let (transport, server) = MockTransport::new();
    let client = Client::new(transport.with_responder(fixture));
    client.connect(address()).await.unwrap();
    (client, server)
}

/// A connected client whose requests stay unanswered until the test replies
/// through the returned [`MockServer`].
pub async fn manual_client() -> (Client<MockTransport>, MockServer) {
    let (transport, server) = MockTransport::new();
    let client = Client::new(transport);
    client.connect(address()).await.unwrap();
    (client, server)
}

/// Teardown after a transport failure happens on the read loop; give it a
/// chance to run.
pub async fn wait_for_state<T: Transport>(client: &Client<T>, state: ConnectionState) {
    for _ in 0..100 {
        if client.state() == state {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("client stuck in {} waiting for {state}", client.state());
}
