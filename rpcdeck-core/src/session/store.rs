use super::types::{CallRequest, InboundData, InboundEvent, MethodId, RequestSession, ResponseSession};
use crate::transport::{Transport, TransportError};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Owns the per-method call state of one application run.
///
/// All three caches are keyed by [`MethodId`], so each method has at most one of each, and the
/// state of one method never affects another.
///
/// Local bookkeeping always happens before the transport is awaited: once a `send`, `push` or
/// `stop` future has been polled for the first time, its cache updates are already visible.
///
/// ## Example
///
/// ```rust,no_run
/// use rpcdeck_core::grpc::GrpcTransport;
/// use rpcdeck_core::prost_reflect::DescriptorPool;
/// use rpcdeck_core::session::{CallMode, CallRequest, CallSessionStore};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = DescriptorPool::decode(std::fs::read("descriptor.bin")?.as_slice())?;
/// let (transport, mut events) = GrpcTransport::connect("http://localhost:50051", pool).await?;
/// let mut store = CallSessionStore::new(transport);
///
/// store
///     .send(CallRequest {
///         id: "echo.EchoService/UnaryEcho".into(),
///         mode: CallMode::Unary,
///         body: serde_json::json!({ "message": "hi" }),
///         metadata: vec![],
///     })
///     .await?;
///
/// while let Some(event) = events.recv().await {
///     store.apply(event);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CallSessionStore<T> {
    transport: T,
    requests: HashMap<MethodId, RequestSession>,
    responses: HashMap<MethodId, ResponseSession>,
    running: HashMap<MethodId, bool>,
}

impl<T> CallSessionStore<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            requests: HashMap::new(),
            responses: HashMap::new(),
            running: HashMap::new(),
        }
    }

    /// Opens a new call, discarding everything recorded for the method so far.
    ///
    /// Streaming calls are flagged as running. The body is recorded as the first entry of the
    /// request history before the transport is asked to open the call. If the transport rejects
    /// the call the running flag is cleared and the error is returned.
    pub async fn send(&mut self, request: CallRequest) -> Result<(), TransportError> {
        let id = request.id.clone();

        self.clear(&id);
        if request.mode.is_streaming() {
            self.running.insert(id.clone(), true);
        }
        self.record_request(&request);

        tracing::debug!(method = %id, mode = ?request.mode, "Opening call");

        if let Err(err) = self.transport.issue_call(request).await {
            tracing::warn!(method = %id, error = %err, "Transport rejected the call");
            if let Some(running) = self.running.get_mut(&id) {
                *running = false;
            }
            return Err(err);
        }

        Ok(())
    }

    /// Sends an extra frame on the open call of a client or bidirectional stream.
    ///
    /// The store does not check the call mode; callers must only push to modes that accept frames
    /// (see [`super::CallMode::accepts_frames`]).
    pub async fn push(&mut self, request: CallRequest) -> Result<(), TransportError> {
        self.record_request(&request);

        tracing::debug!(method = %request.id, "Pushing frame");

        self.transport.issue_frame(request).await
    }

    /// Marks the call as stopped and asks the transport to cancel it.
    ///
    /// The running flag is cleared right away, whether or not the transport ever confirms.
    pub async fn stop(&mut self, id: &MethodId) -> Result<(), TransportError> {
        self.running.insert(id.clone(), false);

        tracing::debug!(method = %id, "Stopping call");

        self.transport.cancel(id).await
    }

    /// Records a payload received from the transport.
    pub fn on_inbound_data(&mut self, data: InboundData) {
        let InboundData {
            id, body, metadata, ..
        } = data;

        match self.responses.entry(id) {
            Entry::Occupied(mut session) => session.get_mut().receive(body, metadata),
            Entry::Vacant(slot) => {
                slot.insert(ResponseSession::new(body, metadata));
            }
        }
    }

    /// Records the end of a call. Histories are kept for inspection.
    pub fn on_inbound_end(&mut self, id: &MethodId) {
        match self.running.get_mut(id) {
            Some(running) => *running = false,
            None => tracing::debug!(method = %id, "Ignoring end event without a running call"),
        }
    }

    /// Dispatches an inbound event to the matching handler.
    pub fn apply(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Data(data) => self.on_inbound_data(data),
            InboundEvent::End { id } => self.on_inbound_end(&id),
        }
    }

    pub fn request_session(&self, id: &MethodId) -> Option<&RequestSession> {
        self.requests.get(id)
    }

    pub fn response_session(&self, id: &MethodId) -> Option<&ResponseSession> {
        self.responses.get(id)
    }

    /// The running flag of a method, `None` if it has none (unary calls, or never called).
    pub fn running(&self, id: &MethodId) -> Option<bool> {
        self.running.get(id).copied()
    }

    pub fn is_running(&self, id: &MethodId) -> bool {
        self.running(id).unwrap_or(false)
    }

    /// Drops the request history, response history and running flag of a method.
    pub fn clear(&mut self, id: &MethodId) {
        self.requests.remove(id);
        self.responses.remove(id);
        self.running.remove(id);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Cancels every running call and hands the transport back.
    ///
    /// All calls are cancelled even if some cancellations fail; the first failure is returned.
    pub async fn shutdown(mut self) -> Result<T, TransportError> {
        let mut running: Vec<MethodId> = self
            .running
            .iter()
            .filter(|(_, running)| **running)
            .map(|(id, _)| id.clone())
            .collect();
        running.sort();

        let mut first_error = None;
        for id in running {
            if let Err(err) = self.stop(&id).await {
                tracing::warn!(method = %id, error = %err, "Failed to cancel call on shutdown");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(self.transport),
        }
    }

    fn record_request(&mut self, request: &CallRequest) {
        self.requests
            .entry(request.id.clone())
            .or_default()
            .prepend(request.body.clone());
    }
}
