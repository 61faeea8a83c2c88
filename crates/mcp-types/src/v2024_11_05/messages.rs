use serde::de::DeserializeOwned;

pub trait MessageSchema: DeserializeOwned {
    fn method(&self) -> String;
    fn params(&self) -> Option<serde_json::Map<String, serde_json::Value>>;
}

/// Macro for implementing the `MessageSchema` trait for a given type that has
/// a `method` field and a `params` field, along with a `METHOD` constant for
/// the wire name.
macro_rules! impl_message_schema {
    ($type:ty, $method:literal) => {
        impl $type {
            pub const METHOD: &'static str = $method;
        }

        impl MessageSchema for $type {
            fn method(&self) -> String {
                self.method.clone()
            }

            fn params(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
                serde_json::to_value(&self.params)
                    .ok()
                    .and_then(|v| v.as_object().cloned())
            }
        }
    };
}

use super::types::*;

impl_message_schema!(InitializedNotification, "notifications/initialized");

impl_message_schema!(CallToolRequest, "tools/call");
impl_message_schema!(InitializeRequest, "initialize");
impl_message_schema!(ListResourcesRequest, "resources/list");
impl_message_schema!(ListToolsRequest, "tools/list");
impl_message_schema!(PingRequest, "ping");
impl_message_schema!(ReadResourceRequest, "resources/read");

impl CallToolRequest {
    pub fn new(params: CallToolRequestParams) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params,
        }
    }
}

impl InitializeRequest {
    pub fn new(params: InitializeRequestParams) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params,
        }
    }
}

impl InitializedNotification {
    pub fn new() -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params: None,
        }
    }
}

impl Default for InitializedNotification {
    fn default() -> Self {
        Self::new()
    }
}

impl ListResourcesRequest {
    pub fn new(cursor: Option<String>) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params: Some(ListResourcesRequestParams { cursor }),
        }
    }
}

impl ListToolsRequest {
    pub fn new(cursor: Option<String>) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params: Some(ListToolsRequestParams { cursor }),
        }
    }
}

impl PingRequest {
    pub fn new() -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params: None,
        }
    }
}

impl Default for PingRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadResourceRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            params: ReadResourceRequestParams { uri: uri.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{InitializeRequest, InitializeRequestParams, LATEST_PROTOCOL_VERSION};

    use super::*;

    #[test]
    fn test_message_schema() {
        let request = InitializeRequest::new(InitializeRequestParams {
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "test".to_string(),
                version: "1.0.0".to_string(),
            },
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
        });
        assert_eq!(request.method(), "initialize");
        assert_eq!(
            request.params().unwrap().get("protocolVersion").unwrap(),
            LATEST_PROTOCOL_VERSION
        );
    }

    #[test]
    fn test_call_tool_params_keep_arguments() {
        let arguments = json!({ "id": 7, "psychographic": { "interests": ["mcp"] } });
        let request = CallToolRequest::new(CallToolRequestParams {
            name: "update_persona".to_string(),
            arguments: arguments.as_object().cloned(),
        });

        assert_eq!(request.method(), "tools/call");
        let params = request.params().unwrap();
        assert_eq!(params.get("name").unwrap(), "update_persona");
        assert_eq!(params.get("arguments").unwrap(), &arguments);
    }

    #[test]
    fn test_paramless_requests_have_no_params() {
        assert_eq!(PingRequest::new().method(), "ping");
        assert!(PingRequest::new().params().is_none());
        assert!(InitializedNotification::new().params().is_none());
    }
}
