//! # Metadata
//!
//! Out-of-band key/value pairs that travel alongside every call.
//!
//! Keys ending in `-bin` carry binary values. The operator edits those values as text and picks a
//! [`ParseType`] that says how the text maps to bytes (width, signedness and byte order). The
//! [`codec`] module performs that conversion in both directions.
pub mod codec;
mod types;

pub use types::*;
