use mcp_client::Transport;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    client::{PersonaClient, PersonaError},
    model::{Attributes, Demographic, NewPersona, Persona, PersonaList, PersonaUpdate},
};

/// What [`walkthrough`] saw at each step.
#[derive(Debug, Clone, PartialEq)]
pub struct Walkthrough {
    pub schema: Value,
    pub listed: PersonaList,
    /// The first listed persona, read once as a resource and once through
    /// the `get_persona` tool.
    pub first: Option<(Persona, Persona)>,
    pub created: Option<Persona>,
    pub updated: Option<Persona>,
    pub refetched: Option<Persona>,
    pub deleted: Option<String>,
}

fn interests(values: &[&str]) -> Attributes {
    Attributes::from_iter([("interests".to_string(), json!(values))])
}

/// Schema, list, fetch the first persona both ways, then create, update,
/// re-read and delete a scratch persona.
///
/// Steps run strictly one after another and the first failure ends the run.
/// When the server has no personas the run stops after listing.
pub async fn walkthrough<T: Transport>(
    personas: &PersonaClient<'_, T>,
) -> Result<Walkthrough, PersonaError> {
    let schema = personas.schema().await?;
    let listed = personas.list(1, 5).await?;

    let mut summary = Walkthrough {
        schema,
        listed,
        first: None,
        created: None,
        updated: None,
        refetched: None,
        deleted: None,
    };

    let Some(first_id) = summary.listed.personas.first().map(|persona| persona.id) else {
        info!("no personas on the server");
        return Ok(summary);
    };

    info!(id = first_id, "fetching first persona");
    let by_resource = personas.get_resource(first_id).await?;
    let by_tool = personas.get(first_id).await?;
    summary.first = Some((by_resource, by_tool));

    let new = NewPersona::new("MCP Created Persona")
        .demographic(Demographic {
            country: Some("United States".to_string()),
            city: Some("San Francisco".to_string()),
            age: Some(30),
            ..Default::default()
        })
        .psychographic(interests(&["technology", "AI", "programming"]));
    let created = personas.create(&new).await?;
    let id = created.id;
    summary.created = Some(created);

    let update = PersonaUpdate {
        psychographic: Some(interests(&["technology", "AI", "programming", "MCP"])),
        ..Default::default()
    };
    summary.updated = Some(personas.update(id, &update).await?);
    summary.refetched = Some(personas.get(id).await?);
    summary.deleted = Some(personas.delete(id).await?);

    info!(id, "walkthrough complete");
    Ok(summary)
}
