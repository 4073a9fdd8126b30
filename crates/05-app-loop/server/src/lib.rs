//! RPC server whose operations run either serialized with the host loop or
//! freely on worker threads.
//!
//! Use [`Server::async_run`] to start the worker threads, and call
//! [`Server::sync_run_for`] from the host loop to run a slice of synchronous
//! work on the host's thread.
//!
//! Operations bound with [`Server::bind_async`] run on the worker that
//! received the call. Operations bound with [`Server::bind_sync`] only run
//! inside `sync_run_for`, so their bodies never race host-loop state.

mod config;
mod error;
mod procedure;
mod server;
mod worker;

pub use config::{ServerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_THREAD_NAME};
pub use error::{ServerError, ServerResult};
pub use server::{Lifecycle, Server};

pub use dispatch::{Discipline, Handler};
pub use sync_context::PumpReport;
pub use transport::{CallMode, ErrorKind, Reply, Request, Response, ResponseError, Transport};
