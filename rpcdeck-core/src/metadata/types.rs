use super::codec::{self, EncodeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix that marks a metadata key as binary-valued.
pub const BINARY_KEY_SUFFIX: &str = "-bin";

/// Byte order used by the multi-byte parse types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// How the bytes of a metadata value should be interpreted.
///
/// The numeric codes are part of the persisted wire shape and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ParseType {
    Text,
    Int8,
    Int16Le,
    Int16Be,
    Int32Le,
    Int32Be,
    FloatLe,
    FloatBe,
    DoubleLe,
    DoubleBe,
    UInt8,
    UInt16Le,
    UInt16Be,
    UInt32Le,
    UInt32Be,
    BigInt64Be,
    BigInt64Le,
    BigUInt64Be,
    BigUInt64Le,
    /// A code this version does not know about. Kept so it survives a load/save cycle.
    Unrecognized(u8),
}

impl ParseType {
    /// Every known parse type, in code order.
    pub const ALL: [ParseType; 19] = [
        ParseType::Text,
        ParseType::Int8,
        ParseType::Int16Le,
        ParseType::Int16Be,
        ParseType::Int32Le,
        ParseType::Int32Be,
        ParseType::FloatLe,
        ParseType::FloatBe,
        ParseType::DoubleLe,
        ParseType::DoubleBe,
        ParseType::UInt8,
        ParseType::UInt16Le,
        ParseType::UInt16Be,
        ParseType::UInt32Le,
        ParseType::UInt32Be,
        ParseType::BigInt64Be,
        ParseType::BigInt64Le,
        ParseType::BigUInt64Be,
        ParseType::BigUInt64Le,
    ];

    pub fn code(&self) -> u8 {
        match self {
            ParseType::Text => 0,
            ParseType::Int8 => 1,
            ParseType::Int16Le => 2,
            ParseType::Int16Be => 3,
            ParseType::Int32Le => 4,
            ParseType::Int32Be => 5,
            ParseType::FloatLe => 6,
            ParseType::FloatBe => 7,
            ParseType::DoubleLe => 8,
            ParseType::DoubleBe => 9,
            ParseType::UInt8 => 10,
            ParseType::UInt16Le => 11,
            ParseType::UInt16Be => 12,
            ParseType::UInt32Le => 13,
            ParseType::UInt32Be => 14,
            ParseType::BigInt64Be => 15,
            ParseType::BigInt64Le => 16,
            ParseType::BigUInt64Be => 17,
            ParseType::BigUInt64Le => 18,
            ParseType::Unrecognized(code) => *code,
        }
    }

    /// Number of bytes the numeric value occupies, `None` for text and unknown codes.
    pub fn width(&self) -> Option<usize> {
        match self {
            ParseType::Int8 | ParseType::UInt8 => Some(1),
            ParseType::Int16Le | ParseType::Int16Be => Some(2),
            ParseType::UInt16Le | ParseType::UInt16Be => Some(2),
            ParseType::Int32Le | ParseType::Int32Be => Some(4),
            ParseType::UInt32Le | ParseType::UInt32Be => Some(4),
            ParseType::FloatLe | ParseType::FloatBe => Some(4),
            ParseType::DoubleLe | ParseType::DoubleBe => Some(8),
            ParseType::BigInt64Le | ParseType::BigInt64Be => Some(8),
            ParseType::BigUInt64Le | ParseType::BigUInt64Be => Some(8),
            ParseType::Text | ParseType::Unrecognized(_) => None,
        }
    }

    /// Byte order of the multi-byte types. Single byte types report little endian.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        match self {
            ParseType::Int16Be
            | ParseType::Int32Be
            | ParseType::FloatBe
            | ParseType::DoubleBe
            | ParseType::UInt16Be
            | ParseType::UInt32Be
            | ParseType::BigInt64Be
            | ParseType::BigUInt64Be => Some(ByteOrder::Big),
            ParseType::Text | ParseType::Unrecognized(_) => None,
            _ => Some(ByteOrder::Little),
        }
    }

    /// Display name, as shown to the operator and accepted by [`ParseType::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            ParseType::Text => "Text",
            ParseType::Int8 => "Int8",
            ParseType::Int16Le => "Int16LE",
            ParseType::Int16Be => "Int16BE",
            ParseType::Int32Le => "Int32LE",
            ParseType::Int32Be => "Int32BE",
            ParseType::FloatLe => "FloatLE",
            ParseType::FloatBe => "FloatBE",
            ParseType::DoubleLe => "DoubleLE",
            ParseType::DoubleBe => "DoubleBE",
            ParseType::UInt8 => "UInt8",
            ParseType::UInt16Le => "UInt16LE",
            ParseType::UInt16Be => "UInt16BE",
            ParseType::UInt32Le => "UInt32LE",
            ParseType::UInt32Be => "UInt32BE",
            ParseType::BigInt64Be => "BigInt64BE",
            ParseType::BigInt64Le => "BigInt64LE",
            ParseType::BigUInt64Be => "BigUInt64BE",
            ParseType::BigUInt64Le => "BigUInt64LE",
            ParseType::Unrecognized(_) => "Unrecognized",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<ParseType> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl From<u8> for ParseType {
    fn from(code: u8) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(ParseType::Unrecognized(code))
    }
}

impl From<ParseType> for u8 {
    fn from(value: ParseType) -> Self {
        value.code()
    }
}

impl fmt::Display for ParseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseType::Unrecognized(code) => write!(f, "Unrecognized({code})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A single metadata pair.
///
/// `value` always holds the raw bytes that go on (or came off) the wire. Use [`MetadataEntry::render`]
/// to turn them into text according to `parse_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub id: String,
    pub key: String,
    pub value: Vec<u8>,
    pub parse_type: ParseType,
}

impl MetadataEntry {
    /// Builds an entry from operator-supplied text, encoding it with `parse_type`.
    pub fn parse(
        id: impl Into<String>,
        key: impl Into<String>,
        text: &str,
        parse_type: ParseType,
    ) -> Result<Self, EncodeError> {
        Ok(Self {
            id: id.into(),
            key: key.into(),
            value: codec::encode(text, parse_type)?,
            parse_type,
        })
    }

    /// Builds an entry around bytes that were already received.
    pub fn raw(id: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value,
            parse_type: ParseType::Text,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.key.ends_with(BINARY_KEY_SUFFIX)
    }

    /// Renders the value as text. Never fails, see [`codec::decode`].
    pub fn render(&self) -> String {
        codec::decode(&self.value, self.parse_type)
    }

    /// Returns the same bytes tagged with a different parse type.
    pub fn reinterpret(&self, parse_type: ParseType) -> Self {
        Self {
            parse_type,
            ..self.clone()
        }
    }
}
