//! Wire-level primitives shared by the dispatch server and its callers.
//!
//! The dispatch core itself is typed end to end; this crate owns the boundary
//! where calls become bytes:
//! * [`CallMode`] / [`Request`] / [`Reply`] – what travels between caller and server.
//! * [`ResponseError`] – the failure surface a caller observes.
//! * [`codec`] – msgpack encoding of argument tuples and results.
//! * [`Transport`] – the inbound call source worker threads pull from.
//! * [`loopback`] – an in-process transport used by tests and demos.

pub mod codec;
mod endpoint;
mod error;
mod loopback;
mod wire;

pub use codec::{decode, encode};
pub use endpoint::{Inbound, InboundCall, Transport};
pub use error::{ClientError, CodecError};
pub use loopback::{loopback, LoopbackClient, LoopbackListener, PendingReply, DEFAULT_CLIENT_TIMEOUT};
pub use wire::{CallMode, ErrorKind, Payload, Reply, Request, Response, ResponseError};
