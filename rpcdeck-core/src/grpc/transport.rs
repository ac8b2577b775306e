use super::client::{GrpcClient, GrpcRequestError};
use super::metadata::{metadata_entries, metadata_map};
use crate::BoxError;
use crate::session::{CallMode, CallRequest, CallStatus, InboundData, InboundEvent, MethodId};
use crate::transport::{Transport, TransportError};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorPool, MethodDescriptor};
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{
    Response, Status, Streaming,
    client::GrpcService,
    metadata::MetadataMap,
    transport::{Channel, Endpoint},
};

/// How many pushed frames may wait for the server before `issue_frame` starts waiting.
const FRAME_BUFFER: usize = 32;

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// A [`Transport`] performing dynamic gRPC calls against the methods of a [`DescriptorPool`].
///
/// Each call runs on its own task and reports through the channel returned on construction:
/// every response message becomes an [`InboundEvent::Data`], and an [`InboundEvent::End`] follows
/// once the call is over. A status returned by the server is delivered as data too, with a body of
/// the form `{"error": {"code": 5, "message": "..."}}`, the status metadata and
/// [`InboundData::status`] set.
///
/// Cancelling a client stream half-closes it and waits for the server's answer. Cancelling a
/// bidirectional stream half-closes it and stops reading responses. Unary and server streaming
/// calls are aborted. Every cancelled call ends with an [`InboundEvent::End`].
///
/// Dropping the transport aborts every call still in flight.
#[derive(Debug)]
pub struct GrpcTransport<S = Channel> {
    client: GrpcClient<S>,
    pool: DescriptorPool,
    events: UnboundedSender<InboundEvent>,
    calls: HashMap<MethodId, ActiveCall>,
}

#[derive(Debug)]
struct ActiveCall {
    /// Outbound half of a client or bidirectional stream. `None` for the other modes, and once
    /// the stream has been half-closed.
    frames: Option<mpsc::Sender<Value>>,
    /// Tells a bidirectional call to stop reading responses.
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GrpcTransport<Channel> {
    /// Connects to `addr` (e.g. `http://localhost:50051`) and serves the methods of `pool`.
    pub async fn connect(
        addr: &str,
        pool: DescriptorPool,
    ) -> Result<(Self, UnboundedReceiver<InboundEvent>), ClientConnectError> {
        let endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| ClientConnectError::InvalidUrl(addr.to_string(), e))?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(addr.to_string(), e))?;

        Ok(Self::new(channel, pool))
    }
}

impl<S> GrpcTransport<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError> + Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Builds a transport over any gRPC service, e.g. an in-process server.
    pub fn new(service: S, pool: DescriptorPool) -> (Self, UnboundedReceiver<InboundEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let transport = Self {
            client: GrpcClient::new(service),
            pool,
            events,
            calls: HashMap::new(),
        };

        (transport, receiver)
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Whether a call for `id` is still in flight.
    pub fn is_open(&self, id: &MethodId) -> bool {
        self.calls
            .get(id)
            .is_some_and(|call| !call.task.is_finished())
    }

    fn method(&self, id: &MethodId) -> Result<MethodDescriptor, TransportError> {
        self.pool
            .get_service_by_name(id.service())
            .and_then(|service| service.methods().find(|m| m.name() == id.method()))
            .ok_or_else(|| TransportError::MethodNotFound(id.clone()))
    }

    fn discard(&mut self, id: &MethodId) {
        if let Some(call) = self.calls.remove(id) {
            tracing::debug!(method = %id, "Discarding previous call");
            call.task.abort();
        }
    }
}

impl<S> Transport for GrpcTransport<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError> + Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn issue_call(&mut self, request: CallRequest) -> Result<(), TransportError> {
        let CallRequest {
            id,
            mode,
            body,
            metadata,
        } = request;

        let method = self.method(&id)?;
        let metadata = metadata_map(&metadata)?;

        let actual = CallMode::from_flags(method.is_client_streaming(), method.is_server_streaming());
        if actual != mode {
            tracing::debug!(method = %id, requested = ?mode, actual = ?actual, "Call mode follows the schema");
        }

        self.discard(&id);
        self.calls.retain(|_, call| !call.task.is_finished());

        let call = CallTask {
            client: self.client.clone(),
            method,
            id: id.clone(),
            metadata,
            events: self.events.clone(),
        };

        let active = match actual {
            CallMode::Unary => ActiveCall {
                frames: None,
                stop: None,
                task: tokio::spawn(call.unary(body)),
            },
            CallMode::ServerStream => ActiveCall {
                frames: None,
                stop: None,
                task: tokio::spawn(call.server_streaming(body)),
            },
            CallMode::ClientStream | CallMode::BidirectionalStream => {
                let (frames, rx) = mpsc::channel(FRAME_BUFFER);
                frames
                    .try_send(body)
                    .map_err(|_| TransportError::StreamClosed(id.clone()))?;

                if actual == CallMode::ClientStream {
                    ActiveCall {
                        frames: Some(frames),
                        stop: None,
                        task: tokio::spawn(call.client_streaming(ReceiverStream::new(rx))),
                    }
                } else {
                    let (stop, stopped) = oneshot::channel();
                    ActiveCall {
                        frames: Some(frames),
                        stop: Some(stop),
                        task: tokio::spawn(
                            call.bidirectional_streaming(ReceiverStream::new(rx), stopped),
                        ),
                    }
                }
            }
        };

        tracing::debug!(method = %id, mode = ?actual, "Call started");
        self.calls.insert(id, active);

        Ok(())
    }

    async fn issue_frame(&mut self, request: CallRequest) -> Result<(), TransportError> {
        let frames = self
            .calls
            .get(&request.id)
            .and_then(|call| call.frames.clone())
            .ok_or_else(|| TransportError::NoOpenStream(request.id.clone()))?;

        frames
            .send(request.body)
            .await
            .map_err(|_| TransportError::StreamClosed(request.id))
    }

    async fn cancel(&mut self, id: &MethodId) -> Result<(), TransportError> {
        let Some(call) = self.calls.get_mut(id) else {
            return Ok(());
        };

        let half_closed = call.frames.take().is_some();

        if let Some(stop) = call.stop.take() {
            // Bidirectional streams stop reading after the half-close; the task emits the end.
            tracing::debug!(method = %id, "Closing bidirectional stream");
            stop.send(()).ok();
            return Ok(());
        }

        if half_closed {
            // The server still gets to answer the half-closed client stream.
            tracing::debug!(method = %id, "Half-closing stream");
            return Ok(());
        }

        if let Some(call) = self.calls.remove(id)
            && !call.task.is_finished()
        {
            tracing::debug!(method = %id, "Aborting call");
            call.task.abort();
            self.events.send(InboundEvent::End { id: id.clone() }).ok();
        }

        Ok(())
    }
}

impl<S> Drop for GrpcTransport<S> {
    fn drop(&mut self) {
        for call in self.calls.values() {
            call.task.abort();
        }
    }
}

/// Everything a spawned call needs, detached from the transport.
struct CallTask<S> {
    client: GrpcClient<S>,
    method: MethodDescriptor,
    id: MethodId,
    metadata: MetadataMap,
    events: UnboundedSender<InboundEvent>,
}

impl<S> CallTask<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError> + Send,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn unary(mut self, body: Value) {
        let result = self
            .client
            .unary(self.method.clone(), body, self.metadata.clone())
            .await;
        self.single(result);
    }

    async fn client_streaming(mut self, frames: ReceiverStream<Value>) {
        let result = self
            .client
            .client_streaming(self.method.clone(), frames, self.metadata.clone())
            .await;
        self.single(result);
    }

    async fn server_streaming(mut self, body: Value) {
        let result = self
            .client
            .server_streaming(self.method.clone(), body, self.metadata.clone())
            .await;
        self.streaming(result, None).await;
    }

    async fn bidirectional_streaming(
        self,
        frames: ReceiverStream<Value>,
        mut stopped: oneshot::Receiver<()>,
    ) {
        let mut client = self.client.clone();
        let call = client.bidirectional_streaming(self.method.clone(), frames, self.metadata.clone());

        let result = tokio::select! {
            result = call => result,
            _ = &mut stopped => return self.end(),
        };
        self.streaming(result, Some(stopped)).await;
    }

    fn single(self, result: Result<Result<Response<Value>, Status>, GrpcRequestError>) {
        match flatten(result) {
            Ok(response) => {
                let metadata = response.metadata().clone();
                self.data(response.into_inner(), &metadata);
            }
            Err(status) => self.status(&status),
        }
        self.end();
    }

    async fn streaming(
        self,
        result: Result<Result<Response<Streaming<Value>>, Status>, GrpcRequestError>,
        mut stopped: Option<oneshot::Receiver<()>>,
    ) {
        match flatten(result) {
            Ok(response) => {
                let metadata = response.metadata().clone();
                let mut stream = response.into_inner();

                loop {
                    let message = match stopped.as_mut() {
                        Some(stopped) => tokio::select! {
                            message = stream.message() => message,
                            _ = stopped => {
                                tracing::debug!(method = %self.id, "Stopped reading responses");
                                break;
                            }
                        },
                        None => stream.message().await,
                    };

                    match message {
                        Ok(Some(body)) => self.data(body, &metadata),
                        Ok(None) => break,
                        Err(status) => {
                            self.status(&status);
                            break;
                        }
                    }
                }
            }
            Err(status) => self.status(&status),
        }
        self.end();
    }

    fn data(&self, body: Value, metadata: &MetadataMap) {
        self.emit(body, metadata, None);
    }

    fn status(&self, status: &Status) {
        tracing::debug!(method = %self.id, code = ?status.code(), "Call returned an error status");
        let code = i32::from(status.code());
        let body = json!({
            "error": {
                "code": code,
                "message": status.message(),
            }
        });
        let status_info = CallStatus {
            code,
            message: status.message().to_string(),
        };
        self.emit(body, status.metadata(), Some(status_info));
    }

    fn emit(&self, body: Value, metadata: &MetadataMap, status: Option<CallStatus>) {
        let event = InboundEvent::Data(InboundData {
            id: self.id.clone(),
            body,
            metadata: metadata_entries(metadata),
            status,
        });
        self.events.send(event).ok();
    }

    fn end(&self) {
        self.events.send(InboundEvent::End { id: self.id.clone() }).ok();
    }
}

fn flatten<T>(result: Result<Result<T, Status>, GrpcRequestError>) -> Result<T, Status> {
    result.unwrap_or_else(|err| Err(Status::unavailable(err.to_string())))
}
