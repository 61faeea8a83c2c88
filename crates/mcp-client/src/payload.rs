//! Decoded results of resource reads and tool calls.
//!
//! Both carry textual content that is usually serialized JSON. Parsing is
//! opportunistic: [`Payload`] always keeps the raw text, and a
//! [`DecodeError`] only surfaces when the caller asks for a typed value.

use mcp_types::{v2024_11_05::convert, CallToolResult, Content, ResourceContents};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no textual content to decode")]
    Empty,
    #[error("content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] convert::ConvertError),
}

/// Textual content plus its JSON form, when it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    raw: String,
    structured: Option<Value>,
}

impl Payload {
    pub fn from_text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let structured = serde_json::from_str(&raw).ok();
        Self { raw, structured }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    pub fn structured(&self) -> Option<&Value> {
        self.structured.as_ref()
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        match &self.structured {
            Some(value) => Ok(T::deserialize(value)?),
            None => Ok(serde_json::from_str(&self.raw)?),
        }
    }

    /// Like [`Payload::decode`], but checks the value against the JSON Schema
    /// of `T` first.
    pub fn decode_validated<T>(&self) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let value = match &self.structured {
            Some(value) => value.clone(),
            None => serde_json::from_str(&self.raw)?,
        };

        Ok(convert::assert_type(value)?)
    }
}

/// Shared decoding surface of [`ResourceEnvelope`] and [`ToolResult`].
pub trait TextPayload {
    /// The primary textual item, if there is one.
    fn primary_text(&self) -> Option<&str>;

    fn payload(&self) -> Option<Payload> {
        self.primary_text().map(Payload::from_text)
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        self.payload().ok_or(DecodeError::Empty)?.decode()
    }

    fn decode_validated<T>(&self) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        self.payload().ok_or(DecodeError::Empty)?.decode_validated()
    }
}

/// The contents returned for one `resources/read`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEnvelope {
    uri: String,
    contents: Vec<ResourceContents>,
}

impl ResourceEnvelope {
    /// Callers must ensure `contents` holds an item for `uri`.
    pub(crate) fn new(uri: impl Into<String>, contents: Vec<ResourceContents>) -> Self {
        Self {
            uri: uri.into(),
            contents,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn contents(&self) -> &[ResourceContents] {
        &self.contents
    }

    pub fn into_contents(self) -> Vec<ResourceContents> {
        self.contents
    }

    /// The item for the requested URI.
    pub fn primary(&self) -> Option<&ResourceContents> {
        self.contents.iter().find(|item| item.uri() == self.uri)
    }
}

impl TextPayload for ResourceEnvelope {
    fn primary_text(&self) -> Option<&str> {
        self.primary().and_then(ResourceContents::text)
    }
}

/// The content returned by a successful `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    content: Vec<Content>,
    is_error: bool,
}

impl ToolResult {
    pub fn content(&self) -> &[Content] {
        &self.content
    }

    pub fn into_content(self) -> Vec<Content> {
        self.content
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Every textual item, in the order the server produced them.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(Content::as_text)
    }
}

impl From<CallToolResult> for ToolResult {
    fn from(result: CallToolResult) -> Self {
        Self {
            content: result.content,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

impl TextPayload for ToolResult {
    fn primary_text(&self) -> Option<&str> {
        self.content.first().and_then(Content::as_text)
    }
}
