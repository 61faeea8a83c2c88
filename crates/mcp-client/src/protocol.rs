//! Request correlation.
//!
//! Every outgoing request gets a fresh [`RequestId`] and an entry in the
//! [`PendingTable`]. The read loop resolves entries by id as responses arrive,
//! so completion follows arrival order rather than send order. A
//! [`PendingSlot`] owns the waiting side and removes its entry when dropped,
//! whichever way the call ends.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

#[cfg(not(feature = "uuid"))]
use std::sync::atomic::{AtomicI64, Ordering};

use mcp_types::{
    JsonrpcMessage, JsonrpcNotification, JsonrpcRequest, McpError, MessageSchema, RequestId,
};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("remote error {}: {}", .0.code, .0.message)]
    Remote(McpError),
    #[error("connection closed before a response arrived")]
    ConnectionClosed,
    #[error("request timed out after {0:?}")]
    RequestTimedOut(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("request id {0} is already pending")]
    DuplicateRequestId(RequestId),
    #[error("request failed: {0}")]
    RequestFailed(#[from] TransportError),
}

/// What a pending request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ResourceRead,
    ToolCall,
    Listing,
    Session,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResourceRead => "resource-read",
            Self::ToolCall => "tool-call",
            Self::Listing => "listing",
            Self::Session => "session",
        })
    }
}

/// How a pending request was settled.
#[derive(Debug)]
pub(crate) enum Resolution {
    Result(Value),
    Error(McpError),
    Closed,
}

#[derive(Debug)]
pub struct PendingRequest {
    pub kind: OperationKind,
    pub method: String,
    pub server_id: String,
    responder: oneshot::Sender<Resolution>,
}

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<RequestId, PendingRequest>,
}

impl PendingTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    fn insert(&mut self, id: RequestId, request: PendingRequest) -> Result<(), ProtocolError> {
        if self.entries.contains_key(&id) {
            return Err(ProtocolError::DuplicateRequestId(id));
        }
        self.entries.insert(id, request);
        Ok(())
    }

    fn remove(&mut self, id: &RequestId) -> Option<PendingRequest> {
        self.entries.remove(id)
    }

    fn drain(&mut self) -> Vec<(RequestId, PendingRequest)> {
        self.entries.drain().collect()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The waiting side of a registered request.
#[derive(Debug)]
pub struct PendingSlot {
    id: RequestId,
    method: String,
    receiver: oneshot::Receiver<Resolution>,
    table: Arc<Mutex<PendingTable>>,
}

impl PendingSlot {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Suspend until the matching response arrives, `timeout` elapses, or
    /// `cancel` fires.
    pub async fn wait(
        mut self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ProtocolError> {
        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;

            resolution = &mut self.receiver => match resolution {
                Ok(Resolution::Result(value)) => Ok(value),
                Ok(Resolution::Error(error)) => Err(ProtocolError::Remote(error)),
                Ok(Resolution::Closed) | Err(_) => Err(ProtocolError::ConnectionClosed),
            },
            _ = tokio::time::sleep(timeout) => Err(ProtocolError::RequestTimedOut(timeout)),
            _ = cancelled => Err(ProtocolError::Cancelled),
        };

        if let Err(err) = &outcome {
            debug!(id = %self.id, method = %self.method, %err, "request did not complete");
        }

        outcome
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        lock(&self.table).remove(&self.id);
    }
}

pub struct Protocol<T: Transport> {
    transport: Arc<T>,
    pending: Arc<Mutex<PendingTable>>,
    #[cfg(not(feature = "uuid"))]
    next_id: AtomicI64,
}

impl<T: Transport> Protocol<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            pending: Arc::new(Mutex::new(PendingTable::default())),
            #[cfg(not(feature = "uuid"))]
            next_id: AtomicI64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub(crate) fn pending_table(&self) -> Arc<Mutex<PendingTable>> {
        Arc::clone(&self.pending)
    }

    /// Allocate an id and a pending entry for `method`. The entry lives as
    /// long as the returned slot.
    pub fn register(
        &self,
        kind: OperationKind,
        server_id: &str,
        method: &str,
    ) -> Result<PendingSlot, ProtocolError> {
        let id = self.get_request_id();
        let (responder, receiver) = oneshot::channel();

        lock(&self.pending).insert(
            id.clone(),
            PendingRequest {
                kind,
                method: method.to_string(),
                server_id: server_id.to_string(),
                responder,
            },
        )?;

        Ok(PendingSlot {
            id,
            method: method.to_string(),
            receiver,
            table: Arc::clone(&self.pending),
        })
    }

    /// Send `request` under the id already allocated for `slot`.
    pub async fn send_request<R: MessageSchema>(
        &self,
        server_id: &str,
        slot: &PendingSlot,
        request: &R,
    ) -> Result<(), ProtocolError> {
        let request = JsonrpcRequest::new(slot.id.clone(), request.method(), request.params());
        debug!(id = %request.id, method = %request.method, server_id, "sending request");

        self.transport
            .send(server_id, request.into())
            .await
            .map_err(Into::into)
    }

    /// Send a notification with method and params, handling JSON-RPC details internally
    pub async fn send_notification<N: MessageSchema>(
        &self,
        server_id: &str,
        notification: &N,
    ) -> Result<(), ProtocolError> {
        let notification = JsonrpcNotification::new(notification.method(), notification.params());
        debug!(method = %notification.method, server_id, "sending notification");

        self.transport
            .send(server_id, notification.into())
            .await
            .map_err(Into::into)
    }

    /// Fail every outstanding request with `ConnectionClosed`. The table is
    /// emptied before anyone is notified, so a late response finds nothing
    /// to resolve.
    pub fn abandon_all(&self) -> usize {
        let drained = lock(&self.pending).drain();
        let count = drained.len();

        for (id, request) in drained {
            debug!(%id, kind = %request.kind, method = %request.method, "abandoning request");
            let _ = request.responder.send(Resolution::Closed);
        }

        count
    }

    fn get_request_id(&self) -> RequestId {
        #[cfg(not(feature = "uuid"))]
        return RequestId::Integer(self.next_id.fetch_add(1, Ordering::SeqCst));

        #[cfg(feature = "uuid")]
        return RequestId::String(uuid::Uuid::new_v4().to_string());
    }
}

/// Route one inbound message to whoever is waiting for it.
pub(crate) fn dispatch(pending: &Mutex<PendingTable>, message: JsonrpcMessage) {
    let (id, resolution) = match message {
        JsonrpcMessage::Response(response) => (response.id, Resolution::Result(response.result)),
        JsonrpcMessage::Error(error) => (error.id, Resolution::Error(error.error)),
        JsonrpcMessage::Notification(notification) => {
            debug!(method = %notification.method, "ignoring server notification");
            return;
        }
        JsonrpcMessage::Request(request) => {
            warn!(id = %request.id, method = %request.method, "ignoring server-initiated request");
            return;
        }
    };

    let entry = lock(pending).remove(&id);
    match entry {
        Some(request) => {
            debug!(%id, kind = %request.kind, method = %request.method, "response matched");
            if request.responder.send(resolution).is_err() {
                debug!(%id, "caller stopped waiting before the response arrived");
            }
        }
        None => warn!(%id, "response does not match any pending request"),
    }
}
