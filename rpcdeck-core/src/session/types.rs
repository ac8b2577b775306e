use crate::metadata::MetadataEntry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Stable identifier of a method: its fully qualified gRPC path without the leading slash,
/// e.g. `my.package.Greeter/SayHello`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(String);

impl MethodId {
    pub fn new(service_full_name: &str, method: &str) -> Self {
        Self(format!("{service_full_name}/{method}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully qualified service name, e.g. `my.package.Greeter`.
    pub fn service(&self) -> &str {
        self.0.split_once('/').map(|(s, _)| s).unwrap_or(&self.0)
    }

    /// The method name, e.g. `SayHello`. Empty if the id has no `/`.
    pub fn method(&self) -> &str {
        self.0.split_once('/').map(|(_, m)| m).unwrap_or("")
    }
}

impl From<&str> for MethodId {
    fn from(value: &str) -> Self {
        Self(value.trim_start_matches('/').to_string())
    }
}

impl From<String> for MethodId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four shapes a gRPC call can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallMode {
    Unary,
    ClientStream,
    ServerStream,
    BidirectionalStream,
}

impl CallMode {
    pub fn from_flags(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => CallMode::Unary,
            (true, false) => CallMode::ClientStream,
            (false, true) => CallMode::ServerStream,
            (true, true) => CallMode::BidirectionalStream,
        }
    }

    /// Whether the call stays open after the first request, and thus gets a running flag.
    pub fn is_streaming(&self) -> bool {
        !matches!(self, CallMode::Unary)
    }

    /// Whether further frames can be pushed after the call is opened.
    pub fn accepts_frames(&self) -> bool {
        matches!(self, CallMode::ClientStream | CallMode::BidirectionalStream)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallMode::Unary => "Unary Call",
            CallMode::ClientStream => "Client Stream",
            CallMode::ServerStream => "Server Stream",
            CallMode::BidirectionalStream => "Bi-Directional",
        }
    }
}

/// A payload to send for a method, either opening a call or as a mid-stream frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub id: MethodId,
    pub mode: CallMode,
    pub body: serde_json::Value,
    pub metadata: Vec<MetadataEntry>,
}

/// A payload received for a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundData {
    pub id: MethodId,
    pub body: serde_json::Value,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Set when the payload reports a status the server ended the call with, rather than a
    /// response message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CallStatus>,
}

/// A non-OK status returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatus {
    pub code: i32,
    pub message: String,
}

/// Events a transport delivers back to the session owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "lowercase")]
pub enum InboundEvent {
    Data(InboundData),
    End { id: MethodId },
}

impl InboundEvent {
    pub fn id(&self) -> &MethodId {
        match self {
            InboundEvent::Data(data) => &data.id,
            InboundEvent::End { id } => id,
        }
    }
}

/// Payloads sent during the current call of a method, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSession {
    streams: VecDeque<serde_json::Value>,
}

impl RequestSession {
    pub(crate) fn prepend(&mut self, body: serde_json::Value) {
        self.streams.push_front(body);
    }

    pub fn streams(&self) -> &VecDeque<serde_json::Value> {
        &self.streams
    }

    pub fn latest(&self) -> Option<&serde_json::Value> {
        self.streams.front()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Payloads received during the current call of a method, most recent first, together with the
/// metadata that came with the latest one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSession {
    streams: VecDeque<serde_json::Value>,
    metadata: Vec<MetadataEntry>,
}

impl ResponseSession {
    pub(crate) fn new(body: serde_json::Value, metadata: Vec<MetadataEntry>) -> Self {
        Self {
            streams: VecDeque::from([body]),
            metadata,
        }
    }

    pub(crate) fn receive(&mut self, body: serde_json::Value, metadata: Vec<MetadataEntry>) {
        self.streams.push_front(body);
        self.metadata = metadata;
    }

    pub fn streams(&self) -> &VecDeque<serde_json::Value> {
        &self.streams
    }

    /// The most recently received payload.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.streams.front()
    }

    pub fn metadata(&self) -> &[MetadataEntry] {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
