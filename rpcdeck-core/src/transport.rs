//! # Transport
//!
//! The seam between the [`crate::session::CallSessionStore`] and whatever actually moves bytes.
//!
//! A transport accepts three outbound operations and reports back asynchronously through
//! [`crate::session::InboundEvent`]s, which the session owner feeds into the store. How those events
//! are delivered is up to the implementation; [`crate::grpc::GrpcTransport`] hands out a `tokio`
//! channel receiver.
use crate::grpc::client::GrpcRequestError;
use crate::session::{CallRequest, MethodId};
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Method '{0}' not found")]
    MethodNotFound(MethodId),

    #[error("Method '{0}' has no open stream accepting frames")]
    NoOpenStream(MethodId),

    #[error("The stream for method '{0}' was closed")]
    StreamClosed(MethodId),

    #[error("gRPC client request error: '{0}'")]
    Request(#[from] GrpcRequestError),

    #[error("Transport rejected the operation: {0}")]
    Rejected(String),
}

/// Outbound half of a transport.
pub trait Transport {
    /// Opens a new call for `request.id`, sending `request.body` as the first payload.
    ///
    /// Any call still open for the same id is discarded. Events carry no call generation, so
    /// events the discarded call already reported (its `end` included) can still reach the owner
    /// after the new call has been opened.
    fn issue_call(
        &mut self,
        request: CallRequest,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends `request.body` as an extra frame on the open call for `request.id`.
    fn issue_frame(
        &mut self,
        request: CallRequest,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Asks the transport to tear down the call for `id`. Cancelling an id without an open call
    /// succeeds.
    fn cancel(&mut self, id: &MethodId) -> impl Future<Output = Result<(), TransportError>> + Send;
}
