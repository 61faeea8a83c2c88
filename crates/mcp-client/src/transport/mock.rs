//! In-memory [`Transport`] for tests and demos.
//!
//! [`MockTransport::new`] returns the transport together with a [`MockServer`]
//! handle. The handle sees everything the client sends and can push responses,
//! inject failures, refuse connections, or hold `open` until released. A responder closure can be installed
//! instead when replies should be produced automatically.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mcp_types::{JsonrpcMessage, JsonrpcRequest, RequestId};
use tokio::sync::{mpsc, Notify};

use super::{Inbound, InboundSender, Transport, TransportError};
use crate::config::Address;

type Responder = Box<dyn Fn(&str, &JsonrpcRequest) -> Option<JsonrpcMessage> + Send + Sync>;

#[derive(Default)]
struct MockState {
    inbound: Option<InboundSender>,
    refuse: Option<String>,
    hold_open: bool,
    opens: usize,
    closes: usize,
}

/// A message the client handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub server_id: String,
    pub message: JsonrpcMessage,
}

impl Sent {
    pub fn request(&self) -> Option<&JsonrpcRequest> {
        match &self.message {
            JsonrpcMessage::Request(request) => Some(request),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.request().map(|request| &request.id)
    }

    pub fn method(&self) -> Option<&str> {
        match &self.message {
            JsonrpcMessage::Request(request) => Some(&request.method),
            JsonrpcMessage::Notification(notification) => Some(&notification.method),
            _ => None,
        }
    }
}

pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    gate: Arc<Notify>,
    sent: mpsc::UnboundedSender<Sent>,
    responder: Option<Responder>,
}

/// Test-side handle for a [`MockTransport`].
pub struct MockServer {
    state: Arc<Mutex<MockState>>,
    gate: Arc<Notify>,
    sent: mpsc::UnboundedReceiver<Sent>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> (Self, MockServer) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let gate = Arc::new(Notify::new());
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();

        (
            Self {
                state: Arc::clone(&state),
                gate: Arc::clone(&gate),
                sent: sent_tx,
                responder: None,
            },
            MockServer {
                state,
                gate,
                sent: sent_rx,
            },
        )
    }

    /// Answer every request with whatever `responder` returns. Returning
    /// `None` leaves the request unanswered.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str, &JsonrpcRequest) -> Option<JsonrpcMessage> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _address: &Address) -> Result<Inbound, TransportError> {
        let held = lock(&self.state).hold_open;
        if held {
            self.gate.notified().await;
        }

        let mut state = lock(&self.state);
        if let Some(reason) = &state.refuse {
            return Err(TransportError::ConnectionFailed(reason.clone().into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.inbound = Some(tx);
        state.opens += 1;

        Ok(rx)
    }

    async fn send(&self, server_id: &str, message: JsonrpcMessage) -> Result<(), TransportError> {
        let inbound = lock(&self.state)
            .inbound
            .clone()
            .ok_or(TransportError::NotOpen)?;

        let reply = match (&self.responder, &message) {
            (Some(responder), JsonrpcMessage::Request(request)) => responder(server_id, request),
            _ => None,
        };

        // The server handle is optional when a responder is installed.
        let _ = self.sent.send(Sent {
            server_id: server_id.to_string(),
            message,
        });

        if let Some(reply) = reply {
            inbound
                .send(Ok(reply))
                .map_err(|_| TransportError::ChannelClosed)?;
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.inbound = None;
        state.closes += 1;

        Ok(())
    }
}

impl MockServer {
    /// Wait for the next message the client sends.
    pub async fn next_sent(&mut self) -> Option<Sent> {
        self.sent.recv().await
    }

    pub fn try_next_sent(&mut self) -> Option<Sent> {
        self.sent.try_recv().ok()
    }

    /// Push a message to the client.
    pub fn respond(&self, message: impl Into<JsonrpcMessage>) -> Result<(), TransportError> {
        self.push(Ok(message.into()))
    }

    /// Make the inbound stream report `error`, as a broken connection would.
    pub fn fail(&self, error: TransportError) -> Result<(), TransportError> {
        self.push(Err(error))
    }

    /// End the inbound stream without an error.
    pub fn hang_up(&self) {
        lock(&self.state).inbound = None;
    }

    pub fn refuse_connections(&self, reason: impl Into<String>) {
        lock(&self.state).refuse = Some(reason.into());
    }

    pub fn accept_connections(&self) {
        lock(&self.state).refuse = None;
    }

    /// Make `open` wait until [`MockServer::release_open`].
    pub fn hold_open(&self) {
        lock(&self.state).hold_open = true;
    }

    /// Let a held `open` finish. Refusal is decided after the release.
    pub fn release_open(&self) {
        lock(&self.state).hold_open = false;
        self.gate.notify_one();
    }

    pub fn opens(&self) -> usize {
        lock(&self.state).opens
    }

    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).inbound.is_some()
    }

    fn push(&self, item: Result<JsonrpcMessage, TransportError>) -> Result<(), TransportError> {
        let state = lock(&self.state);
        let inbound = state.inbound.as_ref().ok_or(TransportError::NotOpen)?;
        inbound.send(item).map_err(|_| TransportError::ChannelClosed)
    }
}
