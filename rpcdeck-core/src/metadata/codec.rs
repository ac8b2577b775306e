//! # Metadata Codec
//!
//! Converts between the text an operator types and the raw bytes of a metadata value.
//!
//! * **Text** values are plain UTF-8.
//! * **Numeric** values are written into a fixed 8-byte window starting at offset 0, using the width
//!   and byte order of the [`ParseType`]. Bytes past the value's width are always zero.
//!
//! Decoding never fails: anything that cannot be read back renders as [`DECODE_ERROR`].
use super::types::ParseType;
use std::num::{ParseFloatError, ParseIntError};

/// Size of the scratch window numeric values are encoded into.
pub const WINDOW_SIZE: usize = 8;

/// Rendered in place of a value whose bytes could not be decoded.
pub const DECODE_ERROR: &str = "decode error";

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("'{value}' is not a valid {parse_type} value: {source}")]
    InvalidInteger {
        value: String,
        parse_type: ParseType,
        source: ParseIntError,
    },
    #[error("'{value}' is not a valid {parse_type} value: {source}")]
    InvalidFloat {
        value: String,
        parse_type: ParseType,
        source: ParseFloatError,
    },
    #[error("Parse type code {0} is not supported")]
    UnsupportedParseType(u8),
}

/// Encodes operator text into the bytes described by `parse_type`.
///
/// Numeric types return the whole [`WINDOW_SIZE`] window.
pub fn encode(value: &str, parse_type: ParseType) -> Result<Vec<u8>, EncodeError> {
    let mut window = [0u8; WINDOW_SIZE];

    match parse_type {
        ParseType::Text => return Ok(value.as_bytes().to_vec()),
        ParseType::Unrecognized(code) => return Err(EncodeError::UnsupportedParseType(code)),

        ParseType::Int8 => put(&mut window, &int::<i8>(value, parse_type)?.to_le_bytes()),
        ParseType::UInt8 => put(&mut window, &int::<u8>(value, parse_type)?.to_le_bytes()),

        ParseType::Int16Le => put(&mut window, &int::<i16>(value, parse_type)?.to_le_bytes()),
        ParseType::Int16Be => put(&mut window, &int::<i16>(value, parse_type)?.to_be_bytes()),
        ParseType::UInt16Le => put(&mut window, &int::<u16>(value, parse_type)?.to_le_bytes()),
        ParseType::UInt16Be => put(&mut window, &int::<u16>(value, parse_type)?.to_be_bytes()),

        ParseType::Int32Le => put(&mut window, &int::<i32>(value, parse_type)?.to_le_bytes()),
        ParseType::Int32Be => put(&mut window, &int::<i32>(value, parse_type)?.to_be_bytes()),
        ParseType::UInt32Le => put(&mut window, &int::<u32>(value, parse_type)?.to_le_bytes()),
        ParseType::UInt32Be => put(&mut window, &int::<u32>(value, parse_type)?.to_be_bytes()),

        ParseType::BigInt64Le => put(&mut window, &int::<i64>(value, parse_type)?.to_le_bytes()),
        ParseType::BigInt64Be => put(&mut window, &int::<i64>(value, parse_type)?.to_be_bytes()),
        ParseType::BigUInt64Le => put(&mut window, &int::<u64>(value, parse_type)?.to_le_bytes()),
        ParseType::BigUInt64Be => put(&mut window, &int::<u64>(value, parse_type)?.to_be_bytes()),

        ParseType::FloatLe => put(&mut window, &float::<f32>(value, parse_type)?.to_le_bytes()),
        ParseType::FloatBe => put(&mut window, &float::<f32>(value, parse_type)?.to_be_bytes()),
        ParseType::DoubleLe => put(&mut window, &float::<f64>(value, parse_type)?.to_le_bytes()),
        ParseType::DoubleBe => put(&mut window, &float::<f64>(value, parse_type)?.to_be_bytes()),
    }

    Ok(window.to_vec())
}

/// Renders `bytes` as text according to `parse_type`.
///
/// * Short or malformed input renders as [`DECODE_ERROR`].
/// * Unknown parse types render a length-only placeholder and are never read as numbers.
pub fn decode(bytes: &[u8], parse_type: ParseType) -> String {
    if let ParseType::Unrecognized(_) = parse_type {
        return format!("[Buffer ... {} bytes]", bytes.len());
    }

    try_decode(bytes, parse_type).unwrap_or_else(|| DECODE_ERROR.to_string())
}

fn try_decode(bytes: &[u8], parse_type: ParseType) -> Option<String> {
    let text = match parse_type {
        ParseType::Text => std::str::from_utf8(bytes).ok()?.to_string(),
        ParseType::Unrecognized(_) => return None,

        ParseType::Int8 => i8::from_le_bytes(take(bytes)?).to_string(),
        ParseType::UInt8 => u8::from_le_bytes(take(bytes)?).to_string(),

        ParseType::Int16Le => i16::from_le_bytes(take(bytes)?).to_string(),
        ParseType::Int16Be => i16::from_be_bytes(take(bytes)?).to_string(),
        ParseType::UInt16Le => u16::from_le_bytes(take(bytes)?).to_string(),
        ParseType::UInt16Be => u16::from_be_bytes(take(bytes)?).to_string(),

        ParseType::Int32Le => i32::from_le_bytes(take(bytes)?).to_string(),
        ParseType::Int32Be => i32::from_be_bytes(take(bytes)?).to_string(),
        ParseType::UInt32Le => u32::from_le_bytes(take(bytes)?).to_string(),
        ParseType::UInt32Be => u32::from_be_bytes(take(bytes)?).to_string(),

        ParseType::BigInt64Le => i64::from_le_bytes(take(bytes)?).to_string(),
        ParseType::BigInt64Be => i64::from_be_bytes(take(bytes)?).to_string(),
        ParseType::BigUInt64Le => u64::from_le_bytes(take(bytes)?).to_string(),
        ParseType::BigUInt64Be => u64::from_be_bytes(take(bytes)?).to_string(),

        ParseType::FloatLe => f32::from_le_bytes(take(bytes)?).to_string(),
        ParseType::FloatBe => f32::from_be_bytes(take(bytes)?).to_string(),
        ParseType::DoubleLe => f64::from_le_bytes(take(bytes)?).to_string(),
        ParseType::DoubleBe => f64::from_be_bytes(take(bytes)?).to_string(),
    };

    Some(text)
}

fn put(window: &mut [u8; WINDOW_SIZE], bytes: &[u8]) {
    window[..bytes.len()].copy_from_slice(bytes);
}

fn take<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

fn int<T>(value: &str, parse_type: ParseType) -> Result<T, EncodeError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    value
        .trim()
        .parse()
        .map_err(|source| EncodeError::InvalidInteger {
            value: value.to_string(),
            parse_type,
            source,
        })
}

fn float<T>(value: &str, parse_type: ParseType) -> Result<T, EncodeError>
where
    T: std::str::FromStr<Err = ParseFloatError>,
{
    value
        .trim()
        .parse()
        .map_err(|source| EncodeError::InvalidFloat {
            value: value.to_string(),
            parse_type,
            source,
        })
}
