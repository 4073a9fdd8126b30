#![deny(missing_docs)]
//! Handler adaptation for the dispatch server.
//!
//! A bound handler is any `Fn(A1, .., An) -> Response<R>` (up to eight
//! arguments). Binding turns it into `Fn(CallMode, (A1, .., An)) -> Response<R>`
//! through one of two bridges:
//! * [`wrap_sync_call`] – defers the body into a [`sync_context::SyncContext`]
//!   and, for blocking calls, waits for the host pump to run it.
//! * [`wrap_async_call`] – runs the body inline on the calling thread.
//!
//! Argument and result types pass through untouched; only the calling
//! convention changes.

mod bridge;
mod handler;

pub use bridge::{wrap_async_call, wrap_sync_call, Discipline};
pub use handler::Handler;
pub use transport::{CallMode, Response, ResponseError};
