use std::time::Duration;

use thiserror::Error;

use crate::wire::ResponseError;

/// Failures converting between typed values and msgpack payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Failures observed by a [`crate::LoopbackClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("server replied with error: {0}")]
    Response(#[from] ResponseError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("transport disconnected")]
    Disconnected,
}

impl ClientError {
    /// Returns the server-side error when the call reached a handler.
    pub fn response(&self) -> Option<&ResponseError> {
        match self {
            ClientError::Response(err) => Some(err),
            _ => None,
        }
    }
}
