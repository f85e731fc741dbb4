//! Error types shared by every store backend.

use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a [`Codec`](crate::codec::Codec) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Failure reported by a codec while encoding or decoding a value.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CodecError(#[from] BoxError);

impl CodecError {
    /// Wraps any error produced by a codec.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Errors that can occur while operating on a store.
///
/// "Key not found" is never an error: reads report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is an empty string
    #[error("the passed key is an empty string, which is invalid")]
    InvalidKey,

    /// The value carries nothing (`None` or `()`)
    #[error("the passed value is nil, which is not allowed")]
    InvalidValue,

    /// The TTL cannot be turned into a deadline
    #[error("ttl of {0:?} is out of range")]
    InvalidTtl(Duration),

    /// The codec failed to encode a value
    #[error("encode error: {0}")]
    Encode(#[source] CodecError),

    /// The codec failed to decode stored bytes
    #[error("decode error: {0}")]
    Decode(#[source] CodecError),

    /// Storage I/O failure other than "not found"
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store was constructed outside a Tokio runtime
    #[error("no Tokio runtime available to run the expiry sweeper")]
    NoRuntime,

    /// The store has been closed
    #[error("store is closed")]
    Closed,
}
