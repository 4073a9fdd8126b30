//! Msgpack codec for argument tuples and results.
//!
//! Argument tuples encode as msgpack arrays, so a handler taking `(i32, i32)`
//! expects the caller to send `[a, b]`. Unit encodes as nil.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;
use crate::wire::Payload;

pub fn encode<T>(value: &T) -> Result<Payload, CodecError>
where
    T: Serialize + ?Sized,
{
    Ok(rmp_serde::to_vec(value)?)
}

pub fn decode<T>(bytes: &[u8]) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    Ok(rmp_serde::from_slice(bytes)?)
}
