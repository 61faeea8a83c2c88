//! An MCP client for reading resources and invoking tools on a remote server.
//!
//! [`Client`] owns a [`Transport`], tracks the connection lifecycle and
//! correlates each request with its response by id, so calls may overlap
//! freely. Results come back as [`ResourceEnvelope`] and [`ToolResult`],
//! whose textual payloads can be decoded into caller types on demand.
//! Failures are reported as [`ClientError`].

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod protocol;
/// The [`Transport`] trait and an in-memory implementation
pub mod transport;

pub use client::{Client, ConnectionState};
pub use config::{Address, ClientConfig, ConfigError, RequestOptions, DEFAULT_REQUEST_TIMEOUT};
pub use error::ClientError;
pub use payload::{DecodeError, Payload, ResourceEnvelope, TextPayload, ToolResult};
pub use protocol::OperationKind;
pub use transport::{Transport, TransportError};
