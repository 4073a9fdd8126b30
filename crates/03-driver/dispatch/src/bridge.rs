use std::panic;
use std::sync::Arc;

use log::warn;
use sync_context::{DeferredTask, SyncHandle};
use transport::{CallMode, Response, ResponseError};

use crate::handler::Handler;

/// Execution discipline an operation was bound with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Runs inside the host's pump, serialized with other synchronous calls.
    Synchronous,
    /// Runs inline on whichever worker received the call.
    Asynchronous,
}

/// Wraps `handler` so each call is executed by whoever pumps `queue`.
///
/// Every call posts exactly one deferred task. In [`CallMode::Blocking`] the
/// caller then waits for the pump to run it and receives the handler's
/// response; a panic in the handler is re-raised on the caller's thread. In
/// [`CallMode::FireAndForget`] the caller gets
/// [`ResponseError::result_ignored`] immediately and the handler's failure,
/// if any, is only logged.
///
/// A blocking call waits indefinitely if the queue is never pumped.
pub fn wrap_sync_call<H, Args>(
    queue: SyncHandle,
    handler: H,
) -> impl Fn(CallMode, Args) -> Response<H::Output> + Send + Sync + 'static
where
    H: Handler<Args>,
    Args: Send + 'static,
{
    let handler = Arc::new(handler);
    move |mode: CallMode, args: Args| {
        let handler = Arc::clone(&handler);
        let (task, result) = DeferredTask::new(move || {
            let response = handler.call(args);
            if let (CallMode::FireAndForget, Err(err)) = (mode, &response) {
                warn!("fire-and-forget synchronous call failed: {err}");
            }
            response
        });

        if queue.post(task).is_err() {
            return Err(ResponseError::internal("sync context is closed"));
        }
        if !mode.is_blocking() {
            return Err(ResponseError::result_ignored());
        }

        match result.wait() {
            Ok(Ok(response)) => response,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(err) => Err(ResponseError::internal(format!(
                "synchronous call did not run: {err}"
            ))),
        }
    }
}

/// Wraps `handler` so each call runs inline on the calling thread, whatever
/// the call mode.
pub fn wrap_async_call<H, Args>(
    handler: H,
) -> impl Fn(CallMode, Args) -> Response<H::Output> + Send + Sync + 'static
where
    H: Handler<Args>,
    Args: 'static,
{
    move |_mode: CallMode, args: Args| handler.call(args)
}
