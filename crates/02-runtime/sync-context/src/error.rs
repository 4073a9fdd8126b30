use thiserror::Error;

/// Convenience result alias for serialized-context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors surfaced by the serialized execution context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Another thread is already pumping this context.
    #[error("sync context is already being pumped on another thread")]
    AlreadyPumping,

    /// The context was dropped; posted work can no longer run.
    #[error("sync context is closed")]
    Closed,

    /// The task was discarded without running.
    #[error("deferred task dropped before it ran")]
    TaskLost,
}
