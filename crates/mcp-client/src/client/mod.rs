use std::sync::{Arc, Mutex, Weak};

use mcp_types::{
    CallToolRequest, CallToolRequestParams, CallToolResult, ClientCapabilities,
    InitializeRequest, InitializeRequestParams, InitializeResult, InitializedNotification,
    ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult, MessageSchema,
    PingRequest, ReadResourceRequest, ReadResourceResult,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::{
    config::{Address, ClientConfig, RequestOptions},
    error::ClientError,
    payload::{ResourceEnvelope, TextPayload, ToolResult},
    protocol::{self, lock, OperationKind, PendingTable, Protocol},
    transport::{Inbound, Transport},
};

mod state;

pub use state::ConnectionState;
use state::Lifecycle;

/// The background task draining the transport's inbound stream. Dropping it
/// stops the task.
struct Reader {
    cancel: DropGuard,
    handle: JoinHandle<()>,
}

impl Reader {
    async fn stop(self) {
        self.cancel.disarm().cancel();
        if let Err(err) = self.handle.await {
            warn!(%err, "read loop ended abnormally");
        }
    }
}

struct Inner<T: Transport> {
    protocol: Protocol<T>,
    config: ClientConfig,
    lifecycle: Mutex<Lifecycle>,
    reader: Mutex<Option<Reader>>,
    server: Mutex<Option<InitializeResult>>,
    /// Signalled each time a teardown lands in `Disconnected`.
    settled: Notify,
}

/// An MCP client over a single transport.
///
/// Every operation takes `&self`, so any number of reads and tool calls may
/// be in flight at once; each resolves when its own response arrives.
pub struct Client<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::build(transport, ClientConfig::default())
    }

    /// Fails with [`ClientError::Config`] if `config` does not validate.
    pub fn with_config(transport: T, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: T, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                protocol: Protocol::new(transport),
                config,
                lifecycle: Mutex::new(Lifecycle::default()),
                reader: Mutex::new(None),
                server: Mutex::new(None),
                settled: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.lifecycle).state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        self.inner.protocol.transport()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.protocol.pending_count()
    }

    /// What the server reported during [`Client::initialize`], if it ran on
    /// the current connection.
    pub fn server_info(&self) -> Option<InitializeResult> {
        lock(&self.inner.server).clone()
    }

    pub async fn connect(&self, address: Address) -> Result<(), ClientError> {
        let epoch = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            let state = lifecycle.state;
            lifecycle
                .begin_connect()
                .ok_or(ClientError::InvalidState {
                    operation: "connect",
                    state,
                })?
        };

        info!(%address, "connecting");

        let inbound = match self.inner.protocol.transport().open(&address).await {
            Ok(inbound) => inbound,
            Err(source) => {
                self.inner.settle(epoch);
                warn!(%address, error = %source, "connect failed");
                return Err(ClientError::Connection { address, source });
            }
        };

        let established = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            if lifecycle.is(epoch, ConnectionState::Connecting) {
                let cancel = CancellationToken::new();
                let handle = tokio::spawn(read_loop(
                    Arc::downgrade(&self.inner),
                    self.inner.protocol.pending_table(),
                    inbound,
                    cancel.clone(),
                    epoch,
                ));
                *lock(&self.inner.reader) = Some(Reader {
                    cancel: cancel.drop_guard(),
                    handle,
                });
                lifecycle.state = ConnectionState::Connected;
                true
            } else {
                false
            }
        };

        if !established {
            // disconnect() ran while the transport was opening.
            self.inner.close_transport().await;
            self.inner.settle(epoch);
            return Err(ClientError::ConnectionClosed);
        }

        info!(%address, "connected");
        Ok(())
    }

    /// Close the connection and fail every outstanding request with
    /// [`ClientError::ConnectionClosed`]. Safe to call in any state; returns
    /// once the client is `Disconnected`.
    pub async fn disconnect(&self) {
        let (epoch, settled) = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            // Created under the lock so a teardown finishing after it is seen.
            let settled = self.inner.settled.notified();
            match lifecycle.state {
                ConnectionState::Disconnected => return,
                ConnectionState::Connecting | ConnectionState::Closing => {
                    lifecycle.state = ConnectionState::Closing;
                    (None, settled)
                }
                ConnectionState::Connected => {
                    lifecycle.state = ConnectionState::Closing;
                    (Some(lifecycle.epoch), settled)
                }
            }
        };

        let Some(epoch) = epoch else {
            // Another teardown is in progress; it settles the state.
            settled.await;
            info!("disconnected");
            return;
        };

        let reader = lock(&self.inner.reader).take();
        if let Some(reader) = reader {
            reader.stop().await;
        }

        let abandoned = self.inner.protocol.abandon_all();
        self.inner.close_transport().await;
        *lock(&self.inner.server) = None;
        self.inner.settle(epoch);

        info!(abandoned, "disconnected");
    }

    /// Run the `initialize` handshake with `server_id` and announce
    /// `notifications/initialized`.
    pub async fn initialize(&self, server_id: &str) -> Result<InitializeResult, ClientError> {
        let config = &self.inner.config;
        let request = InitializeRequest::new(InitializeRequestParams {
            capabilities: ClientCapabilities::default(),
            client_info: config.client_info.clone(),
            protocol_version: config.protocol_version.clone(),
        });

        let value = self
            .request(
                server_id,
                OperationKind::Session,
                InitializeRequest::METHOD,
                &request,
                &RequestOptions::default(),
                "initialize",
            )
            .await?;
        let result: InitializeResult = parse(InitializeRequest::METHOD, value)?;

        if result.protocol_version != config.protocol_version {
            warn!(
                requested = %config.protocol_version,
                negotiated = %result.protocol_version,
                "server chose a different protocol version"
            );
        }

        self.notify(server_id, &InitializedNotification::new())
            .await?;

        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "initialized"
        );
        *lock(&self.inner.server) = Some(result.clone());

        Ok(result)
    }

    pub async fn ping(&self, server_id: &str) -> Result<(), ClientError> {
        self.request(
            server_id,
            OperationKind::Session,
            PingRequest::METHOD,
            &PingRequest::new(),
            &RequestOptions::default(),
            "ping",
        )
        .await?;

        Ok(())
    }

    pub async fn list_tools(
        &self,
        server_id: &str,
        cursor: Option<String>,
    ) -> Result<ListToolsResult, ClientError> {
        let value = self
            .request(
                server_id,
                OperationKind::Listing,
                ListToolsRequest::METHOD,
                &ListToolsRequest::new(cursor),
                &RequestOptions::default(),
                "list tools",
            )
            .await?;

        parse(ListToolsRequest::METHOD, value)
    }

    pub async fn list_resources(
        &self,
        server_id: &str,
        cursor: Option<String>,
    ) -> Result<ListResourcesResult, ClientError> {
        let value = self
            .request(
                server_id,
                OperationKind::Listing,
                ListResourcesRequest::METHOD,
                &ListResourcesRequest::new(cursor),
                &RequestOptions::default(),
                "list resources",
            )
            .await?;

        parse(ListResourcesRequest::METHOD, value)
    }

    /// Read the resource at `uri` from `server_id`.
    ///
    /// Fails with [`ClientError::ResourceNotFound`] rather than returning an
    /// empty envelope.
    pub async fn read_resource(
        &self,
        server_id: &str,
        uri: &str,
    ) -> Result<ResourceEnvelope, ClientError> {
        self.read_resource_with(server_id, uri, RequestOptions::default())
            .await
    }

    pub async fn read_resource_with(
        &self,
        server_id: &str,
        uri: &str,
        options: RequestOptions,
    ) -> Result<ResourceEnvelope, ClientError> {
        if uri.is_empty() {
            return Err(ClientError::InvalidArgument(
                "resource uri must not be empty".to_string(),
            ));
        }

        let value = self
            .request(
                server_id,
                OperationKind::ResourceRead,
                uri,
                &ReadResourceRequest::new(uri),
                &options,
                "read a resource",
            )
            .await?;
        let result: ReadResourceResult = parse(ReadResourceRequest::METHOD, value)?;

        if result.contents.is_empty() {
            return Err(ClientError::ResourceNotFound {
                uri: uri.to_string(),
                message: "server returned no contents".to_string(),
            });
        }

        if !result.contents.iter().any(|item| item.uri() == uri) {
            return Err(ClientError::ResourceRead {
                uri: uri.to_string(),
                code: None,
                message: "response does not include the requested uri".to_string(),
            });
        }

        debug!(uri, items = result.contents.len(), "resource read");
        Ok(ResourceEnvelope::new(uri, result.contents))
    }

    /// Invoke tool `name` on `server_id`. `args` must serialize to a JSON
    /// object (or to `null` for no arguments).
    ///
    /// A result the server flags with `isError` is returned as
    /// [`ClientError::ToolInvocation`], not as data.
    pub async fn call_tool<A: Serialize>(
        &self,
        server_id: &str,
        name: &str,
        args: A,
    ) -> Result<ToolResult, ClientError> {
        self.call_tool_with(server_id, name, args, RequestOptions::default())
            .await
    }

    pub async fn call_tool_with<A: Serialize>(
        &self,
        server_id: &str,
        name: &str,
        args: A,
        options: RequestOptions,
    ) -> Result<ToolResult, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidArgument(
                "tool name must not be empty".to_string(),
            ));
        }

        let arguments = match serde_json::to_value(args) {
            Ok(Value::Object(arguments)) => Some(arguments),
            Ok(Value::Null) => None,
            Ok(other) => {
                return Err(ClientError::InvalidArgument(format!(
                    "arguments for {name} must be a JSON object, got {other}"
                )))
            }
            Err(err) => {
                return Err(ClientError::InvalidArgument(format!(
                    "arguments for {name} are not serializable: {err}"
                )))
            }
        };

        let request = CallToolRequest::new(CallToolRequestParams {
            name: name.to_string(),
            arguments,
        });
        let value = self
            .request(
                server_id,
                OperationKind::ToolCall,
                name,
                &request,
                &options,
                "call a tool",
            )
            .await?;
        let result = ToolResult::from(parse::<CallToolResult>(CallToolRequest::METHOD, value)?);

        if result.is_error() {
            let message = result
                .primary_text()
                .unwrap_or("tool reported an error")
                .to_string();
            debug!(tool = name, %message, "tool returned an error result");
            return Err(ClientError::ToolInvocation {
                name: name.to_string(),
                code: None,
                message,
                result: Some(Box::new(result)),
            });
        }

        Ok(result)
    }

    /// Register, send and await one request. `target` names what the request
    /// is about (URI, tool name or method) for error reporting.
    async fn request<R>(
        &self,
        server_id: &str,
        kind: OperationKind,
        target: &str,
        request: &R,
        options: &RequestOptions,
        operation: &'static str,
    ) -> Result<Value, ClientError>
    where
        R: MessageSchema + Sync,
    {
        let method = request.method();

        let (epoch, slot) = {
            let lifecycle = lock(&self.inner.lifecycle);
            if lifecycle.state != ConnectionState::Connected {
                return Err(ClientError::InvalidState {
                    operation,
                    state: lifecycle.state,
                });
            }
            // Registered under the lifecycle lock so disconnect() either sees
            // this entry when it drains or we see it closing.
            let slot = self
                .inner
                .protocol
                .register(kind, server_id, &method)
                .map_err(ClientError::Protocol)?;
            (lifecycle.epoch, slot)
        };

        if let Err(err) = self
            .inner
            .protocol
            .send_request(server_id, &slot, request)
            .await
        {
            warn!(%err, %method, server_id, "send failed; dropping connection");
            drop(slot);
            self.inner.connection_lost(epoch).await;
            return Err(ClientError::ConnectionClosed);
        }

        let timeout = options
            .timeout
            .unwrap_or_else(|| self.inner.config.request_timeout());

        slot.wait(timeout, options.cancel.as_ref())
            .await
            .map_err(|err| ClientError::from_protocol(err, kind, &method, target))
    }

    async fn notify<N>(&self, server_id: &str, notification: &N) -> Result<(), ClientError>
    where
        N: MessageSchema + Sync,
    {
        let epoch = {
            let lifecycle = lock(&self.inner.lifecycle);
            if lifecycle.state != ConnectionState::Connected {
                return Err(ClientError::InvalidState {
                    operation: "notify",
                    state: lifecycle.state,
                });
            }
            lifecycle.epoch
        };

        if let Err(err) = self
            .inner
            .protocol
            .send_notification(server_id, notification)
            .await
        {
            warn!(%err, server_id, "send failed; dropping connection");
            self.inner.connection_lost(epoch).await;
            return Err(ClientError::ConnectionClosed);
        }

        Ok(())
    }
}

impl<T: Transport> Inner<T> {
    async fn close_transport(&self) {
        if let Err(err) = self.protocol.transport().close().await {
            warn!(%err, "failed to close transport");
        }
    }

    /// Move connection `epoch` to `Disconnected` and wake every
    /// `disconnect()` waiting for that.
    fn settle(&self, epoch: u64) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.epoch == epoch {
                lifecycle.state = ConnectionState::Disconnected;
            }
        }
        self.settled.notify_waiters();
    }

    /// Tear down connection `epoch` after a transport failure. A no-op if
    /// that connection is already closing or gone.
    async fn connection_lost(&self, epoch: u64) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            if !lifecycle.is(epoch, ConnectionState::Connected) {
                return;
            }
            lifecycle.state = ConnectionState::Closing;
        }

        // Dropping the reader cancels it; this may be running on the reader
        // itself, so it is not joined.
        let reader = lock(&self.reader).take();
        drop(reader);

        let abandoned = self.protocol.abandon_all();
        self.close_transport().await;
        *lock(&self.server) = None;
        self.settle(epoch);

        warn!(abandoned, "connection lost");
    }
}

async fn read_loop<T: Transport>(
    inner: Weak<Inner<T>>,
    pending: Arc<Mutex<PendingTable>>,
    mut inbound: Inbound,
    cancel: CancellationToken,
    epoch: u64,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("read loop cancelled");
                return;
            }
            message = inbound.recv() => {
                match message {
                    Some(Ok(message)) => protocol::dispatch(&pending, message),
                    Some(Err(err)) => {
                        warn!(%err, "transport failed");
                        break;
                    }
                    None => {
                        warn!("transport closed the inbound stream");
                        break;
                    }
                }
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.connection_lost(epoch).await;
    }
}

fn parse<R: DeserializeOwned>(method: &str, value: Value) -> Result<R, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::MalformedResponse {
        method: method.to_string(),
        source,
    })
}
