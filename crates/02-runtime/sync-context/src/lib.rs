#![deny(missing_docs)]
//! Serialized execution context drained only by an explicit pump.
//!
//! Any number of threads post [`DeferredTask`]s through a cloneable
//! [`SyncHandle`]; a single host thread executes them in FIFO order by calling
//! [`SyncContext::run_for`] from its own loop. Nothing runs in the background:
//! a task that is never pumped never runs, and its [`TaskFuture`] never resolves.

mod context;
mod error;
mod task;

pub use context::{PumpReport, SyncContext, SyncHandle};
pub use error::{ContextError, ContextResult};
pub use task::{panic_message, DeferredTask, TaskFuture, TaskOutcome};
