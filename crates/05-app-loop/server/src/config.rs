use std::thread;
use std::time::Duration;

use crate::error::{ServerError, ServerResult};

/// How long an idle worker waits on the transport before re-checking the stop flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Prefix for worker thread names; workers are suffixed `-0`, `-1`, ...
pub const DEFAULT_THREAD_NAME: &str = "rpc-worker";

/// Tunables for a [`crate::Server`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Worker count used by [`crate::Server::start`].
    pub worker_threads: usize,
    pub poll_interval: Duration,
    pub thread_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl ServerConfig {
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.worker_threads == 0 {
            return Err(ServerError::InvalidConfig("worker_threads must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(ServerError::InvalidConfig("poll_interval must be non-zero"));
        }
        if self.thread_name.is_empty() {
            return Err(ServerError::InvalidConfig("thread_name must not be empty"));
        }
        Ok(())
    }
}
