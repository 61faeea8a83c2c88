use mcp_client::{Client, ClientError, DecodeError, TextPayload, Transport};
use mcp_types::v2024_11_05::convert::{self, ConvertError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::model::{NewPersona, Persona, PersonaList, PersonaUpdate};

/// Server id the persona tools and resources live under.
pub const SERVER_ID: &str = "persona-server";

pub const SCHEMA_URI: &str = "persona://schema";

pub fn persona_uri(id: i64) -> String {
    format!("persona://{id}")
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("persona {0} not found")]
    NotFound(i64),

    #[error("invalid persona: {0}")]
    Invalid(#[from] ConvertError),

    #[error("failed to encode persona arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unexpected persona payload: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Typed access to the persona tools and resources through a borrowed
/// [`Client`].
pub struct PersonaClient<'a, T: Transport> {
    client: &'a Client<T>,
    server_id: String,
}

#[derive(Serialize)]
struct UpdateArgs<'u> {
    id: i64,
    #[serde(flatten)]
    update: &'u PersonaUpdate,
}

impl<'a, T: Transport> PersonaClient<'a, T> {
    pub fn new(client: &'a Client<T>) -> Self {
        Self {
            client,
            server_id: SERVER_ID.to_string(),
        }
    }

    /// Route to the client's configured default server instead of
    /// [`SERVER_ID`].
    pub fn from_config(client: &'a Client<T>) -> Self {
        Self {
            client,
            server_id: client.config().default_server.clone(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The JSON Schema the server publishes for personas.
    pub async fn schema(&self) -> Result<Value, PersonaError> {
        let envelope = self
            .client
            .read_resource(&self.server_id, SCHEMA_URI)
            .await?;

        Ok(envelope.decode()?)
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<PersonaList, PersonaError> {
        let result = self
            .client
            .call_tool(
                &self.server_id,
                "list_personas",
                json!({ "page": page, "per_page": per_page }),
            )
            .await?;
        let list: PersonaList = result.decode_validated()?;

        debug!(page, count = list.personas.len(), total = list.total, "listed personas");
        Ok(list)
    }

    /// Fetch a persona through the `get_persona` tool.
    pub async fn get(&self, id: i64) -> Result<Persona, PersonaError> {
        let result = self
            .client
            .call_tool(&self.server_id, "get_persona", json!({ "id": id }))
            .await
            .map_err(not_found(id))?;

        Ok(result.decode_validated()?)
    }

    /// Fetch a persona through its `persona://{id}` resource.
    pub async fn get_resource(&self, id: i64) -> Result<Persona, PersonaError> {
        let envelope = self
            .client
            .read_resource(&self.server_id, &persona_uri(id))
            .await
            .map_err(not_found(id))?;

        Ok(envelope.decode_validated()?)
    }

    pub async fn create(&self, persona: &NewPersona) -> Result<Persona, PersonaError> {
        convert::assert_type::<NewPersona>(serde_json::to_value(persona)?)?;

        let result = self
            .client
            .call_tool(&self.server_id, "create_persona", persona)
            .await?;
        let created: Persona = result.decode_validated()?;

        info!(id = created.id, name = %created.name, "created persona");
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &PersonaUpdate) -> Result<Persona, PersonaError> {
        convert::assert_type::<PersonaUpdate>(serde_json::to_value(update)?)?;
        let arguments = UpdateArgs { id, update };

        let result = self
            .client
            .call_tool(&self.server_id, "update_persona", &arguments)
            .await
            .map_err(not_found(id))?;
        let updated: Persona = result.decode_validated()?;

        debug!(id, "updated persona");
        Ok(updated)
    }

    /// Delete a persona, returning the server's confirmation text.
    pub async fn delete(&self, id: i64) -> Result<String, PersonaError> {
        let result = self
            .client
            .call_tool(&self.server_id, "delete_persona", json!({ "id": id }))
            .await
            .map_err(not_found(id))?;

        let payload = result.payload().ok_or(DecodeError::Empty)?;
        let message = payload
            .structured()
            .and_then(|value| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.into_raw());

        info!(id, "deleted persona");
        Ok(message)
    }
}

/// Report a remote not-found for persona `id` as [`PersonaError::NotFound`].
/// A missing tool stays a client error.
fn not_found(id: i64) -> impl FnOnce(ClientError) -> PersonaError {
    move |err| match err {
        ClientError::ToolNotFound { .. } => PersonaError::Client(err),
        err if err.is_not_found() => PersonaError::NotFound(id),
        err => PersonaError::Client(err),
    }
}
