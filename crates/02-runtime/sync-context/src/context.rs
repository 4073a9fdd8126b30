use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

use crate::error::{ContextError, ContextResult};
use crate::task::{DeferredTask, TaskFuture};

/// Summary of one pump call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Tasks executed during this call.
    pub executed: usize,
    /// Tasks still queued when the call returned.
    pub remaining: usize,
    /// The slice deadline was reached before the queue emptied.
    pub expired: bool,
    /// A stop request ended the call early.
    pub stopped: bool,
}

/// Producer side of a [`SyncContext`]. Clone one per posting thread.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    queue: Sender<DeferredTask>,
    stop_requested: Arc<AtomicBool>,
}

impl SyncHandle {
    /// Appends `task` to the queue. Fails only once the context is gone, in
    /// which case the task is dropped and its future reports `TaskLost`.
    pub fn post(&self, task: DeferredTask) -> ContextResult<()> {
        self.queue.send(task).map_err(|_| ContextError::Closed)
    }

    /// Packages `f` as a deferred task, posts it, and returns its future.
    pub fn submit<F, R>(&self, f: F) -> ContextResult<TaskFuture<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, future) = DeferredTask::new(f);
        self.post(task)?;
        Ok(future)
    }

    /// Asks the pump currently running, if any, to return after its current task.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }
}

/// Single-consumer queue of deferred work, drained by explicit pump calls.
///
/// Tasks run in submission order, one at a time, and only inside
/// [`SyncContext::run_for`] or [`SyncContext::poll`]. At most one thread may
/// pump at a time; a second concurrent pump fails with
/// [`ContextError::AlreadyPumping`].
#[derive(Debug)]
pub struct SyncContext {
    queue: Receiver<DeferredTask>,
    handle: SyncHandle,
    pumping: AtomicBool,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            queue: rx,
            handle: SyncHandle {
                queue: tx,
                stop_requested: Arc::new(AtomicBool::new(false)),
            },
            pumping: AtomicBool::new(false),
        }
    }

    /// Returns a producer handle for posting work from other threads.
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Number of tasks waiting for a pump.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True while some thread is inside a pump call.
    pub fn is_pumping(&self) -> bool {
        self.pumping.load(Ordering::Acquire)
    }

    /// See [`SyncHandle::request_stop`].
    pub fn request_stop(&self) {
        self.handle.request_stop();
    }

    /// Clears any pending stop request, then executes queued tasks on the
    /// calling thread until the queue is empty or `duration` has elapsed.
    ///
    /// The deadline is checked between tasks; a running task is never
    /// interrupted. Returns as soon as the queue is empty, and tasks left over
    /// when the deadline passes stay queued, in order, for the next call.
    pub fn run_for(&self, duration: Duration) -> ContextResult<PumpReport> {
        let _guard = PumpGuard::acquire(&self.pumping)?;
        self.handle.stop_requested.store(false, Ordering::Release);

        let started = Instant::now();
        let mut report = PumpReport::default();
        loop {
            if self.handle.stop_requested.load(Ordering::Acquire) {
                report.stopped = true;
                break;
            }
            if started.elapsed() >= duration {
                report.expired = !self.queue.is_empty();
                break;
            }
            let Ok(task) = self.queue.try_recv() else {
                break;
            };
            task.run();
            report.executed += 1;
        }
        report.remaining = self.queue.len();

        trace!(
            "sync pump ran {} task(s) in {:?}, {} pending",
            report.executed,
            started.elapsed(),
            report.remaining
        );
        Ok(report)
    }

    /// Executes the tasks already queued when called, without a deadline.
    /// Tasks posted while polling wait for the next pump.
    pub fn poll(&self) -> ContextResult<PumpReport> {
        let _guard = PumpGuard::acquire(&self.pumping)?;
        self.handle.stop_requested.store(false, Ordering::Release);

        let mut report = PumpReport::default();
        for _ in 0..self.queue.len() {
            if self.handle.stop_requested.load(Ordering::Acquire) {
                report.stopped = true;
                break;
            }
            let Ok(task) = self.queue.try_recv() else {
                break;
            };
            task.run();
            report.executed += 1;
        }
        report.remaining = self.queue.len();
        Ok(report)
    }
}

/// Marks the context as being pumped for the guard's lifetime.
struct PumpGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PumpGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> ContextResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ContextError::AlreadyPumping)?;
        Ok(Self { flag })
    }
}

impl Drop for PumpGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
