//! Call and reply types exchanged with the dispatch server.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoded argument tuple or result value.
pub type Payload = Vec<u8>;

/// Result type every bound handler returns.
pub type Response<T> = Result<T, ResponseError>;

/// Encoded outcome of one dispatched call.
pub type Reply = Response<Payload>;

/// Per-call flag selecting blocking-with-result or fire-and-forget semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallMode {
    /// The caller waits for the handler result.
    Blocking,
    /// The caller does not wait; synchronous handlers reply with a sentinel.
    FireAndForget,
}

impl CallMode {
    pub fn is_blocking(self) -> bool {
        matches!(self, CallMode::Blocking)
    }
}

/// Coarse classification of a [`ResponseError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The handler body reported a failure.
    Handler,
    /// Sentinel for fire-and-forget calls on the synchronous path.
    ResultIgnored,
    /// No handler is bound under the requested name.
    UnknownMethod,
    /// The argument payload did not decode into the handler's parameter tuple.
    InvalidArguments,
    /// The dispatch machinery failed around the handler (panic, lost task, encode failure).
    Internal,
}

/// Failure returned to a caller in place of a handler result.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ResponseError {
    kind: ErrorKind,
    message: String,
}

impl ResponseError {
    /// Handler-level failure carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Handler, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Sentinel returned by synchronous handlers invoked in fire-and-forget mode.
    pub fn result_ignored() -> Self {
        Self::with_kind(ErrorKind::ResultIgnored, "result ignored on async call")
    }

    pub fn unknown_method(method: &str) -> Self {
        Self::with_kind(
            ErrorKind::UnknownMethod,
            format!("no handler bound for {method:?}"),
        )
    }

    pub fn invalid_arguments(method: &str, detail: impl std::fmt::Display) -> Self {
        Self::with_kind(
            ErrorKind::InvalidArguments,
            format!("invalid arguments for {method:?}: {detail}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable description of the failure.
    pub fn what(&self) -> &str {
        &self.message
    }

    pub fn is_result_ignored(&self) -> bool {
        self.kind == ErrorKind::ResultIgnored
    }
}

/// One inbound call as delivered by a [`crate::Transport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub mode: CallMode,
    /// Msgpack-encoded argument tuple.
    pub args: Payload,
}

impl Request {
    pub fn new(method: impl Into<String>, mode: CallMode, args: Payload) -> Self {
        Self {
            method: method.into(),
            mode,
            args,
        }
    }
}
