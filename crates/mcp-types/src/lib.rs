//! Wire types for the Model Context Protocol, revision `2024-11-05`.
//!
//! Only the subset a resource/tool client needs is modelled: the JSON-RPC
//! envelope, the initialize handshake, resources and tools.

#[cfg(feature = "2024_11_05")]
pub mod v2024_11_05;

#[cfg(feature = "2024_11_05")]
pub use v2024_11_05::{error::ErrorCode, messages::MessageSchema, types::*};

/// Protocol revision advertised during `initialize`.
pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";

/// Value of the `jsonrpc` member on every message.
pub const JSONRPC_VERSION: &str = "2.0";
