use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use mcp_client::{transport::mock::MockTransport, Address, Client, ClientConfig};
use mcp_types::{ErrorCode, JsonrpcError, JsonrpcMessage, JsonrpcRequest, JsonrpcResponse, McpError};
use persona_mcp::SERVER_ID;
use serde_json::{json, Map, Value};

const TIMESTAMP: &str = "2025-03-01T10:00:00";

#[derive(Default)]
struct Store {
    next_id: i64,
    personas: BTreeMap<i64, Value>,
}

/// In-memory stand-in for the persona server, answering over a
/// [`MockTransport`] responder.
#[derive(Clone, Default)]
pub struct PersonaServer {
    store: Arc<Mutex<Store>>,
}

fn text(request: &JsonrpcRequest, value: &Value) -> JsonrpcMessage {
    JsonrpcResponse::new(
        request.id.clone(),
        json!({ "content": [{ "type": "text", "text": value.to_string() }] }),
    )
    .into()
}

fn error(request: &JsonrpcRequest, code: ErrorCode, message: impl Into<String>) -> JsonrpcMessage {
    JsonrpcError::new(request.id.clone(), McpError::new(code, message)).into()
}

impl PersonaServer {
    pub fn seeded(names: &[&str]) -> Self {
        let server = Self::default();
        for name in names {
            server.insert(Map::from_iter([("name".to_string(), json!(name))]));
        }
        server
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().personas.len()
    }

    fn insert(&self, fields: Map<String, Value>) -> Value {
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        let id = store.next_id;

        let persona = json!({
            "id": id,
            "name": fields.get("name").cloned().unwrap_or(Value::Null),
            "created_at": TIMESTAMP,
            "updated_at": TIMESTAMP,
            "demographic": fields.get("demographic").cloned().unwrap_or(Value::Null),
            "psychographic": fields.get("psychographic").cloned().unwrap_or(Value::Null),
            "behavioral": fields.get("behavioral").cloned().unwrap_or(Value::Null),
            "contextual": fields.get("contextual").cloned().unwrap_or(Value::Null),
        });
        store.personas.insert(id, persona.clone());
        persona
    }

    pub fn handle(&self, server_id: &str, request: &JsonrpcRequest) -> Option<JsonrpcMessage> {
        if server_id != SERVER_ID {
            return Some(error(
                request,
                ErrorCode::MethodNotFound,
                format!("Unknown server: {server_id}"),
            ));
        }

        let params = request.params.clone().unwrap_or_default();
        match request.method.as_str() {
            "resources/read" => {
                let uri = params.get("uri").and_then(Value::as_str).unwrap_or_default();
                Some(self.read(request, uri))
            }
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
                let arguments = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Some(self.call(request, name, arguments))
            }
            _ => Some(error(request, ErrorCode::MethodNotFound, "Method not found")),
        }
    }

    fn read(&self, request: &JsonrpcRequest, uri: &str) -> JsonrpcMessage {
        let contents = |text: String| -> JsonrpcMessage {
            JsonrpcResponse::new(
                request.id.clone(),
                json!({ "contents": [{ "uri": uri, "mimeType": "application/json", "text": text }] }),
            )
            .into()
        };

        if uri == "persona://schema" {
            return contents(
                json!({ "type": "object", "required": ["name"], "properties": { "name": { "type": "string" } } })
                    .to_string(),
            );
        }

        let persona = uri
            .strip_prefix("persona://")
            .and_then(|id| id.parse::<i64>().ok())
            .and_then(|id| self.store.lock().unwrap().personas.get(&id).cloned());

        match persona {
            Some(persona) => contents(persona.to_string()),
            None => error(
                request,
                ErrorCode::ResourceNotFound,
                format!("Resource not found: {uri}"),
            ),
        }
    }

    fn call(&self, request: &JsonrpcRequest, name: &str, arguments: Map<String, Value>) -> JsonrpcMessage {
        let id = arguments.get("id").and_then(Value::as_i64);
        let missing = || error(request, ErrorCode::ResourceNotFound, "Persona not found");

        match name {
            "list_personas" => {
                let page = arguments.get("page").and_then(Value::as_u64).unwrap_or(1).max(1);
                let per_page = arguments.get("per_page").and_then(Value::as_u64).unwrap_or(20).max(1);
                let store = self.store.lock().unwrap();
                let total = store.personas.len() as u64;
                let personas: Vec<Value> = store
                    .personas
                    .values()
                    .skip(((page - 1) * per_page) as usize)
                    .take(per_page as usize)
                    .cloned()
                    .collect();

                text(
                    request,
                    &json!({
                        "personas": personas,
                        "total": total,
                        "page": page,
                        "per_page": per_page,
                        "pages": total.div_ceil(per_page),
                    }),
                )
            }
            "get_persona" => {
                let persona = id.and_then(|id| self.store.lock().unwrap().personas.get(&id).cloned());
                match persona {
                    Some(persona) => text(request, &persona),
                    None => missing(),
                }
            }
            "create_persona" => {
                if !arguments.contains_key("name") {
                    return JsonrpcResponse::new(
                        request.id.clone(),
                        json!({
                            "content": [{ "type": "text", "text": "Error: Name is required" }],
                            "isError": true,
                        }),
                    )
                    .into();
                }
                let persona = self.insert(arguments);
                text(request, &persona)
            }
            "update_persona" => {
                let mut store = self.store.lock().unwrap();
                let persona = match id {
                    Some(id) => store.personas.get_mut(&id),
                    None => None,
                };
                let Some(persona) = persona else {
                    return missing();
                };
                for (field, value) in arguments {
                    if field != "id" {
                        persona[field.as_str()] = value;
                    }
                }
                text(request, persona)
            }
            "delete_persona" => {
                let removed = id.and_then(|id| self.store.lock().unwrap().personas.remove(&id));
                match (id, removed) {
                    (Some(id), Some(_)) => text(
                        request,
                        &json!({ "message": format!("Persona {id} deleted successfully") }),
                    ),
                    _ => missing(),
                }
            }
            _ => error(
                request,
                ErrorCode::MethodNotFound,
                format!("Unknown tool: {name}"),
            ),
        }
    }
}

pub async fn connected(server: &PersonaServer, config: ClientConfig) -> Client<MockTransport> {
    let (transport, _handle) = MockTransport::new();
    let server = server.clone();
    let transport = transport.with_responder(move |server_id, request| server.handle(server_id, request));

    let client = Client::with_config(transport, config).unwrap();
    client
        .connect(Address::new("localhost", 8123))
        .await
        .unwrap();
    client
}
