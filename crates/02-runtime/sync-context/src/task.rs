use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::warn;

use crate::error::{ContextError, ContextResult};

/// Value stored in a [`TaskFuture`]: the task's return value, or the panic
/// payload if the task unwound.
pub type TaskOutcome<R> = std::thread::Result<R>;

/// One pending unit of work, paired at creation with exactly one [`TaskFuture`].
pub struct DeferredTask {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl DeferredTask {
    /// Packages `f` into a task and returns the future its outcome lands in.
    ///
    /// Running the task never unwinds: a panic inside `f` is captured into the
    /// future. If the future was already dropped, a captured panic is logged.
    pub fn new<F, R>(f: F) -> (Self, TaskFuture<R>)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            if let Err(unobserved) = tx.send(outcome) {
                if let Err(payload) = unobserved.into_inner() {
                    warn!(
                        "deferred task panicked with no caller waiting: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        });
        (Self { job }, TaskFuture { outcome: rx })
    }

    pub(crate) fn run(self) {
        (self.job)()
    }
}

impl std::fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredTask").finish_non_exhaustive()
    }
}

/// One-shot slot fulfilled by whichever thread runs the paired task.
#[derive(Debug)]
pub struct TaskFuture<R> {
    outcome: Receiver<TaskOutcome<R>>,
}

impl<R> TaskFuture<R> {
    /// Blocks until the task has run and returns its outcome.
    ///
    /// There is no timeout: if the context is never pumped this never returns.
    pub fn wait(self) -> ContextResult<TaskOutcome<R>> {
        self.outcome.recv().map_err(|_| ContextError::TaskLost)
    }

    /// Like [`TaskFuture::wait`], but gives up after `timeout` and hands the
    /// future back so the caller may keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<ContextResult<TaskOutcome<R>>, Self> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Ok(Ok(outcome)),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(ContextError::TaskLost)),
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }

    /// Blocks for the result, re-raising a captured panic on this thread.
    pub fn get(self) -> ContextResult<R> {
        match self.wait()? {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// True once the task has run and its outcome is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        !self.outcome.is_empty()
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
