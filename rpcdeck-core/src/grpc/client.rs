//! # Generic gRPC Client
//!
//! Wraps a standard `tonic` client to provide a generic interface for gRPC communication. It is
//! agnostic to the specific Protobuf messages being exchanged.
//!
//! The [`GrpcClient`] uses [`super::codec::JsonCodec`] to handle serialization and builds the HTTP/2
//! path (e.g., `/package.Service/Method`) at runtime from the `MethodDescriptor`.
//!
//! Every call returns the whole `tonic::Response` so the caller can read the response metadata.
use super::codec::JsonCodec;
use crate::BoxError;
use futures_util::Stream;
use http_body::Body as HttpBody;
use prost_reflect::MethodDescriptor;
use std::str::FromStr;
use tonic::{
    Response, Status, Streaming,
    client::GrpcService,
    metadata::{
        MetadataMap,
        errors::{InvalidMetadataKey, InvalidMetadataValueBytes},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValueBytes,
    },
}

/// A dynamic gRPC client speaking JSON.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

type UnaryResult = Result<Result<Response<serde_json::Value>, Status>, GrpcRequestError>;
type StreamingResult = Result<Result<Response<Streaming<serde_json::Value>>, Status>, GrpcRequestError>;

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(Response))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn unary(
        &mut self,
        method: MethodDescriptor,
        payload: serde_json::Value,
        metadata: MetadataMap,
    ) -> UnaryResult {
        self.ready().await?;

        let codec = JsonCodec::new(method.input(), method.output());
        let path = http_path(&method);

        Ok(self
            .client
            .unary(build_request(payload, metadata), path, codec)
            .await)
    }

    /// Performs a Server Streaming gRPC call (Single Request -> Stream of Responses).
    pub async fn server_streaming(
        &mut self,
        method: MethodDescriptor,
        payload: serde_json::Value,
        metadata: MetadataMap,
    ) -> StreamingResult {
        self.ready().await?;

        let codec = JsonCodec::new(method.input(), method.output());
        let path = http_path(&method);

        Ok(self
            .client
            .server_streaming(build_request(payload, metadata), path, codec)
            .await)
    }

    /// Performs a Client Streaming gRPC call (Stream of Requests -> Single Response).
    ///
    /// The call completes once `payload_stream` ends and the server answers.
    pub async fn client_streaming(
        &mut self,
        method: MethodDescriptor,
        payload_stream: impl Stream<Item = serde_json::Value> + Send + 'static,
        metadata: MetadataMap,
    ) -> UnaryResult {
        self.ready().await?;

        let codec = JsonCodec::new(method.input(), method.output());
        let path = http_path(&method);

        Ok(self
            .client
            .client_streaming(build_request(payload_stream, metadata), path, codec)
            .await)
    }

    /// Performs a Bidirectional Streaming gRPC call (Stream of Requests -> Stream of Responses).
    ///
    /// Resolves as soon as the server sends its response headers.
    pub async fn bidirectional_streaming(
        &mut self,
        method: MethodDescriptor,
        payload_stream: impl Stream<Item = serde_json::Value> + Send + 'static,
        metadata: MetadataMap,
    ) -> StreamingResult {
        self.ready().await?;

        let codec = JsonCodec::new(method.input(), method.output());
        let path = http_path(&method);

        Ok(self
            .client
            .streaming(build_request(payload_stream, metadata), path, codec)
            .await)
    }

    async fn ready(&mut self) -> Result<(), GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))
    }
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}

fn build_request<T>(payload: T, metadata: MetadataMap) -> tonic::Request<T> {
    let mut request = tonic::Request::new(payload);
    *request.metadata_mut() = metadata;
    request
}
