//! This module provides the [`Transport`] trait, which is used to send and receive
//! messages between a client and server. Implementors of [`Transport`] are responsible for encoding and
//! decoding messages, as well as transmitting/receiving them.

use std::error::Error;

use async_trait::async_trait;
use mcp_types::JsonrpcMessage;
use tokio::sync::mpsc;

use crate::config::Address;

pub mod mock;

/// Core transport error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(Box<dyn Error + Send + Sync>),
    #[error("Transport is not open")]
    NotOpen,
    #[error("Channel closed")]
    ChannelClosed,
}

/// Messages pushed by the remote side, in arrival order. An `Err` item or the
/// end of the stream means the connection is gone.
pub type Inbound = mpsc::UnboundedReceiver<Result<JsonrpcMessage, TransportError>>;

/// Producer half of [`Inbound`], for transport implementations.
pub type InboundSender = mpsc::UnboundedSender<Result<JsonrpcMessage, TransportError>>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the channel to `address` and hand back the inbound message stream.
    async fn open(&self, address: &Address) -> Result<Inbound, TransportError>;

    /// Send a JSON-RPC message. `server_id` names the upstream the message is
    /// meant for; transports with a single upstream may ignore it.
    async fn send(&self, server_id: &str, message: JsonrpcMessage) -> Result<(), TransportError>;

    /// Close the transport connection
    async fn close(&self) -> Result<(), TransportError>;
}
