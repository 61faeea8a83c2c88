use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open-ended attribute category (`psychographic`, `behavioral`, `contextual`).
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Demographic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(max = 120))]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    /// `"latitude,longitude"`. Accepted on create and update; the server
    /// stores it as `latitude` and `longitude`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^-?\d+(\.\d+)?,\s*-?\d+(\.\d+)?$"))]
    pub geolocation: Option<String>,
}

/// A persona as the server returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Persona {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographic: Option<Demographic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychographic: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual: Option<Attributes>,
}

/// One page of `list_personas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersonaList {
    pub personas: Vec<Persona>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Arguments for `create_persona`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewPersona {
    #[schemars(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographic: Option<Demographic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychographic: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual: Option<Attributes>,
}

impl NewPersona {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            demographic: None,
            psychographic: None,
            behavioral: None,
            contextual: None,
        }
    }

    pub fn demographic(mut self, demographic: Demographic) -> Self {
        self.demographic = Some(demographic);
        self
    }

    pub fn psychographic(mut self, attributes: Attributes) -> Self {
        self.psychographic = Some(attributes);
        self
    }

    pub fn behavioral(mut self, attributes: Attributes) -> Self {
        self.behavioral = Some(attributes);
        self
    }

    pub fn contextual(mut self, attributes: Attributes) -> Self {
        self.contextual = Some(attributes);
        self
    }
}

/// Arguments for `update_persona`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersonaUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographic: Option<Demographic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychographic: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual: Option<Attributes>,
}

impl PersonaUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
