//! Conversion between [`MetadataEntry`] lists and `tonic` metadata maps.
use super::client::GrpcRequestError;
use crate::metadata::MetadataEntry;
use std::collections::HashMap;
use tonic::metadata::{
    Ascii, Binary, KeyAndValueRef, MetadataKey, MetadataMap, MetadataValue,
    errors::InvalidMetadataKey,
};

/// Builds an outgoing metadata map. Keys ending in `-bin` are sent as binary values, every other
/// value must be valid header text.
pub fn metadata_map(entries: &[MetadataEntry]) -> Result<MetadataMap, GrpcRequestError> {
    let mut map = MetadataMap::new();

    for entry in entries {
        let invalid_key = |source: InvalidMetadataKey| GrpcRequestError::InvalidMetadataKey {
            key: entry.key.clone(),
            source,
        };

        if entry.is_binary() {
            let key = MetadataKey::<Binary>::from_bytes(entry.key.as_bytes()).map_err(invalid_key)?;
            map.append_bin(key, MetadataValue::<Binary>::from_bytes(&entry.value));
        } else {
            let key = MetadataKey::<Ascii>::from_bytes(entry.key.as_bytes()).map_err(invalid_key)?;
            let value = MetadataValue::<Ascii>::try_from(entry.value.as_slice()).map_err(|source| {
                GrpcRequestError::InvalidMetadataValue {
                    key: entry.key.clone(),
                    source,
                }
            })?;
            map.append(key, value);
        }
    }

    Ok(map)
}

/// Flattens a received metadata map. Repeated keys get one entry per value, with ids of the form
/// `key_index`. Binary values are base64-decoded.
pub fn metadata_entries(map: &MetadataMap) -> Vec<MetadataEntry> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut entries = vec![];

    for pair in map.iter() {
        let (key, value) = match pair {
            KeyAndValueRef::Ascii(key, value) => (key.as_str(), value.as_bytes().to_vec()),
            KeyAndValueRef::Binary(key, value) => (
                key.as_str(),
                value
                    .to_bytes()
                    .map(|bytes| bytes.to_vec())
                    .unwrap_or_else(|_| value.as_encoded_bytes().to_vec()),
            ),
        };

        let index = seen.entry(key.to_string()).or_default();
        entries.push(MetadataEntry::raw(format!("{key}_{index}"), key, value));
        *index += 1;
    }

    entries
}
