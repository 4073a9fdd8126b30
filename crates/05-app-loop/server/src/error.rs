use sync_context::ContextError;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

/// Misuse of the server's binding and lifecycle surface.
///
/// Handler failures never show up here; they travel back to the caller as a
/// [`transport::ResponseError`] reply.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {0:?} after the server has started")]
    BindAfterStart(String),

    #[error("server was already started")]
    AlreadyStarted,

    #[error("sync queue is already being pumped on another thread")]
    ConcurrentPump,

    #[error("sync context error: {0}")]
    Context(ContextError),

    #[error("invalid server configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<ContextError> for ServerError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::AlreadyPumping => ServerError::ConcurrentPump,
            other => ServerError::Context(other),
        }
    }
}
