//! # Generic gRPC Transport
//!
//! This module contains the building blocks for performing gRPC calls using dynamic message types.
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g., `HelloRequest`), the components
//! here work with generic `serde_json::Value` structures, transcoding them to Protobuf binary format
//! on the fly.
//!
//! * **[`client::GrpcClient`]:** a thin dynamic client exposing the four call shapes.
//! * **[`codec::JsonCodec`]:** the JSON <-> Protobuf codec the client plugs into `tonic`.
//! * **[`GrpcTransport`]:** the [`crate::transport::Transport`] implementation used by the session
//!   store. It runs each call on its own task and reports back through a channel of
//!   [`crate::session::InboundEvent`]s.
pub mod client;
pub mod codec;
mod metadata;
mod transport;

pub use metadata::{metadata_entries, metadata_map};
pub use transport::*;
