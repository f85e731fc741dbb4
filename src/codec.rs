//! Pluggable value encoding.
//!
//! Stores never look inside a payload: they hand values to a [`Codec`] on the
//! way in and bytes back to it on the way out. [`JsonCodec`] is the default.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts typed values to and from an opaque byte payload.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `value` into bytes.
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decodes bytes previously produced by [`Codec::marshal`].
    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

/// JSON encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(data)?)
    }
}
