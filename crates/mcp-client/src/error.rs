use std::time::Duration;

use mcp_types::{ErrorCode, McpError};

use crate::{
    client::ConnectionState,
    config::{Address, ConfigError},
    payload::{DecodeError, ToolResult},
    protocol::{OperationKind, ProtocolError},
    transport::TransportError,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connection {
        address: Address,
        #[source]
        source: TransportError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("connection closed before the request completed")]
    ConnectionClosed,

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("resource not found: {uri}")]
    ResourceNotFound { uri: String, message: String },

    #[error("failed to read resource {uri}: {message}")]
    ResourceRead {
        uri: String,
        code: Option<i64>,
        message: String,
    },

    #[error("tool not found: {name}")]
    ToolNotFound { name: String, message: String },

    #[error("tool {name} failed: {message}")]
    ToolInvocation {
        name: String,
        code: Option<i64>,
        message: String,
        /// The tool's own output when it reported the failure as a result.
        result: Option<Box<ToolResult>>,
    },

    #[error("{method} timed out after {timeout:?}")]
    RequestTimeout { method: String, timeout: Duration },

    #[error("{method} was cancelled")]
    Cancelled { method: String },

    #[error("malformed {method} response: {source}")]
    MalformedResponse {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("remote error {code} on {method}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
}

impl ClientError {
    /// Whether the remote reported that the addressed thing does not exist,
    /// either as an unknown resource/tool or as a not-found error raised by a
    /// tool.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ResourceNotFound { .. } | Self::ToolNotFound { .. } => true,
            Self::ToolInvocation { code, .. } => {
                *code == Some(ErrorCode::ResourceNotFound.code())
            }
            _ => false,
        }
    }

    /// Translate a correlation failure for a request of `kind` that targeted
    /// `target` (a URI, tool name, or method).
    pub(crate) fn from_protocol(
        err: ProtocolError,
        kind: OperationKind,
        method: &str,
        target: &str,
    ) -> Self {
        match err {
            ProtocolError::Remote(error) => Self::from_remote(error, kind, method, target),
            ProtocolError::ConnectionClosed => Self::ConnectionClosed,
            ProtocolError::RequestTimedOut(timeout) => Self::RequestTimeout {
                method: method.to_string(),
                timeout,
            },
            ProtocolError::Cancelled => Self::Cancelled {
                method: method.to_string(),
            },
            other => Self::Protocol(other),
        }
    }

    fn from_remote(error: McpError, kind: OperationKind, method: &str, target: &str) -> Self {
        let McpError { code, message, .. } = error;
        match (kind, ErrorCode::from_code(code)) {
            (OperationKind::ResourceRead, Some(ErrorCode::ResourceNotFound)) => {
                Self::ResourceNotFound {
                    uri: target.to_string(),
                    message,
                }
            }
            (OperationKind::ResourceRead, _) => Self::ResourceRead {
                uri: target.to_string(),
                code: Some(code),
                message,
            },
            (OperationKind::ToolCall, Some(ErrorCode::MethodNotFound)) => Self::ToolNotFound {
                name: target.to_string(),
                message,
            },
            (OperationKind::ToolCall, _) => Self::ToolInvocation {
                name: target.to_string(),
                code: Some(code),
                message,
                result: None,
            },
            (OperationKind::Listing | OperationKind::Session, _) => Self::Remote {
                method: method.to_string(),
                code,
                message,
            },
        }
    }
}
