//! # JSON <-> Protobuf Codec
//!
//! Implements `tonic::codec::Codec` so `tonic` can carry `serde_json::Value` directly, without
//! generated Rust structs.
//!
//! 1. **Encoder (JSON -> Proto)**: validates the value against the input `MessageDescriptor` through
//!    `prost_reflect::DynamicMessage` and writes the Protobuf bytes.
//! 2. **Decoder (Proto -> JSON)**: merges the wire bytes into a `DynamicMessage` of the output type
//!    and serializes it back to JSON with the declared field names and every default value present,
//!    the same shape the schema walker gives sample request bodies.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, SerializeOptions};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A Codec that bridges `serde_json::Value` and Protobuf binary format.
pub struct JsonCodec {
    req_desc: MessageDescriptor,
    res_desc: MessageDescriptor,
}

impl JsonCodec {
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }
}

impl Codec for JsonCodec {
    type Encode = serde_json::Value;
    type Decode = serde_json::Value;

    type Encoder = JsonEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder(self.req_desc.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.res_desc.clone())
    }
}

pub struct JsonEncoder(MessageDescriptor);

impl Encoder for JsonEncoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        let msg = DynamicMessage::deserialize(self.0.clone(), item).map_err(|e| {
            Status::invalid_argument(format!(
                "JSON body does not match the '{}' schema: {}",
                self.0.full_name(),
                e
            ))
        })?;

        msg.encode_raw(dst);
        Ok(())
    }
}

pub struct JsonDecoder(MessageDescriptor);

impl Decoder for JsonDecoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        let options = SerializeOptions::new()
            .use_proto_field_name(true)
            .skip_default_fields(false);
        let value = msg
            .serialize_with_options(serde_json::value::Serializer, &options)
            .map_err(|e| Status::internal(format!("Failed to map response to JSON: {}", e)))?;

        Ok(Some(value))
    }
}
