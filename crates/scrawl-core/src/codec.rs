//! Pluggable value serialization
//!
//! The store never interprets document contents; it only needs a way to turn
//! a value into bytes and back, plus a file extension so content files from
//! different formats never shadow each other.
//!
//! Two codecs are provided:
//! - [`JsonCodec`]: pretty-printed JSON, for databases meant to be inspected
//!   or edited by hand (`doc.json`)
//! - [`CborCodec`]: compact CBOR binary (`doc.cbor`)

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while encoding or decoding document values
#[derive(Error, Debug)]
pub enum CodecError {
    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CBOR encoding failed
    #[error("CBOR encode error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    /// CBOR decoding failed
    #[error("CBOR decode error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),
}

/// Strategy for converting document values to and from bytes
///
/// Implementations must be stateless enough to share across threads; the
/// database holds a single codec instance used by every handle.
pub trait Codec: Send + Sync + 'static {
    /// File extension used for content files (`doc.<ext>`)
    fn extension(&self) -> &'static str;

    /// Encode a value to bytes
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode a value from bytes
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Pretty-printed JSON content files (`doc.json`)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec_pretty(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compact CBOR content files (`doc.cbor`)
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn extension(&self) -> &'static str {
        "cbor"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes)?;
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(ciborium::from_reader(bytes)?)
    }
}
