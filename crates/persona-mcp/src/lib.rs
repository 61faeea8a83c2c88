//! Persona operations on top of [`mcp_client`].
//!
//! The persona server exposes its data both as resources (`persona://schema`,
//! `persona://{id}`) and as tools (`list_personas`, `get_persona`,
//! `create_persona`, `update_persona`, `delete_persona`). [`PersonaClient`]
//! wraps them in typed calls whose payloads are checked against the JSON
//! Schema of the Rust types before they are returned.

pub mod client;
pub mod model;
pub mod walkthrough;

pub use client::{persona_uri, PersonaClient, PersonaError, SCHEMA_URI, SERVER_ID};
pub use model::{Attributes, Demographic, NewPersona, Persona, PersonaList, PersonaUpdate};
pub use walkthrough::{walkthrough, Walkthrough};
