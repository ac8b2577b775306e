//! # rpcdeck Core
//!
//! `rpcdeck-core` is the session engine behind the rpcdeck gRPC explorer. Given a parsed Protobuf
//! schema it lets a client invoke any method in any of the four call modes, keep the request and
//! response history of every method, and show binary metadata values as typed scalars.
//!
//! ## Key Components
//!
//! * **[`schema`]:** turns a descriptor tree into method stubs with deterministic sample bodies.
//! * **[`session::CallSessionStore`]:** per-method request/response history and running state,
//!   driven by a [`transport::Transport`] and the [`session::InboundEvent`]s it reports.
//! * **[`metadata`]:** metadata entries and the fixed-width codec used to read and write binary
//!   values.
//!
//! ## Collaborators
//!
//! * **[`grpc::GrpcTransport`]:** a `tonic` based transport performing dynamic calls with a JSON
//!   codec.
//! * **[`storage::ProtoRepository`]:** a JSON file remembering loaded descriptor sets, hosts and
//!   edited method state.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod grpc;
pub mod metadata;
pub mod schema;
pub mod session;
pub mod storage;
pub mod transport;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
