use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dispatch::{wrap_async_call, wrap_sync_call, Discipline, Handler};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sync_context::{PumpReport, SyncContext};
use transport::{CallMode, Reply, Request, Response, Transport};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::procedure::{Bound, Registry};
use crate::worker::{self, WorkerShared};

/// Where a server is in its one-way lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting bindings; no workers yet.
    Unstarted,
    /// Workers are serving calls; bindings are frozen.
    Running,
    /// Stop was requested. Workers exit after their current call; the sync
    /// queue is still pumped by the host.
    Stopped,
}

/// Binds named operations and serves them from a [`Transport`].
///
/// The sync queue outlives the workers: synchronous calls that were already
/// accepted still run if the host keeps pumping after [`Server::stop`].
pub struct Server<T: Transport> {
    config: ServerConfig,
    transport: Arc<T>,
    registry: Registry,
    sync: SyncContext,
    state: Mutex<Lifecycle>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    live_workers: Arc<AtomicUsize>,
}

impl<T: Transport> Server<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ServerConfig::default())
    }

    pub fn with_config(transport: T, config: ServerConfig) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            registry: Registry::default(),
            sync: SyncContext::new(),
            state: Mutex::new(Lifecycle::Unstarted),
            workers: Mutex::new(Vec::new()),
            stop: Arc::new(AtomicBool::new(false)),
            live_workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Binds `handler` under `name` so that it only runs inside the host's
    /// [`Server::sync_run_for`] calls.
    pub fn bind_sync<H, Args>(&mut self, name: &str, handler: H) -> ServerResult<()>
    where
        H: Handler<Args>,
        H::Output: Serialize,
        Args: DeserializeOwned + Send + 'static,
    {
        let call = wrap_sync_call(self.sync.handle(), handler);
        self.bind(name, Discipline::Synchronous, call)
    }

    /// Binds `handler` under `name` so that it runs on the worker thread that
    /// received the call.
    pub fn bind_async<H, Args>(&mut self, name: &str, handler: H) -> ServerResult<()>
    where
        H: Handler<Args>,
        H::Output: Serialize,
        Args: DeserializeOwned + 'static,
    {
        let call = wrap_async_call(handler);
        self.bind(name, Discipline::Asynchronous, call)
    }

    fn bind<F, Args, R>(&mut self, name: &str, discipline: Discipline, call: F) -> ServerResult<()>
    where
        F: Fn(CallMode, Args) -> Response<R> + Send + Sync + 'static,
        Args: DeserializeOwned + 'static,
        R: Serialize + 'static,
    {
        if name.is_empty() {
            return Err(ServerError::InvalidConfig("operation name must not be empty"));
        }
        if *self.state.lock() != Lifecycle::Unstarted {
            return Err(ServerError::BindAfterStart(name.to_owned()));
        }
        self.registry
            .insert(name, discipline, Arc::new(Bound::new(call)));
        Ok(())
    }

    /// Starts [`ServerConfig::worker_threads`] workers.
    pub fn start(&self) -> ServerResult<()> {
        self.async_run(self.config.worker_threads)
    }

    /// Starts `worker_threads` workers that receive calls and run
    /// asynchronous operations. Returns once the threads are spawned.
    pub fn async_run(&self, worker_threads: usize) -> ServerResult<()> {
        let mut state = self.state.lock();
        if *state != Lifecycle::Unstarted {
            return Err(ServerError::AlreadyStarted);
        }
        self.config
            .clone()
            .with_worker_threads(worker_threads)
            .validate()?;

        let shared = WorkerShared {
            transport: Arc::clone(&self.transport),
            registry: Arc::new(self.registry.clone()),
            stop: Arc::clone(&self.stop),
            live: Arc::clone(&self.live_workers),
            poll_interval: self.config.poll_interval,
        };

        let mut workers = self.workers.lock();
        for idx in 0..worker_threads {
            let shared = shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{idx}", self.config.thread_name))
                .spawn(move || worker::run(shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    warn!("failed to spawn rpc worker {idx}: {err}");
                    self.stop.store(true, Ordering::Release);
                    *state = Lifecycle::Stopped;
                    return Err(ServerError::Spawn(err));
                }
            }
        }

        *state = Lifecycle::Running;
        info!(
            "rpc server running with {worker_threads} worker(s) and {} operation(s)",
            self.registry.len()
        );
        Ok(())
    }

    /// Runs queued synchronous calls on the calling thread for at most `duration`.
    ///
    /// Returns early once the queue is empty or [`Server::stop_sync_run`] is
    /// called. Must not be called from inside a handler.
    pub fn sync_run_for(&self, duration: Duration) -> ServerResult<PumpReport> {
        Ok(self.sync.run_for(duration)?)
    }

    /// Runs only the synchronous calls that are already queued.
    pub fn sync_poll(&self) -> ServerResult<PumpReport> {
        Ok(self.sync.poll()?)
    }

    /// Makes an in-progress [`Server::sync_run_for`] return after its current call.
    pub fn stop_sync_run(&self) {
        self.sync.request_stop();
    }

    /// Synchronous calls waiting for the host to pump them.
    pub fn pending_sync_calls(&self) -> usize {
        self.sync.pending()
    }

    /// Asks every worker to exit after its current call. Does not wait.
    ///
    /// Only the inbound side is gated: a host pump in progress keeps running
    /// queued synchronous calls. Use [`Server::stop_sync_run`] to cut it short.
    /// Workers blocked on a synchronous call only exit once the host pumps
    /// that call, so a host that stops should drain with `sync_run_for`.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == Lifecycle::Stopped {
            return;
        }
        self.stop.store(true, Ordering::Release);
        debug!("rpc server stopping from {:?}", *state);
        *state = Lifecycle::Stopped;
    }

    /// Waits up to `timeout` for all workers to exit, joining the ones that
    /// did. Returns true when none are left.
    pub fn join_workers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let all_finished = self.workers.lock().iter().all(|h| h.is_finished());
            if all_finished || Instant::now() >= deadline {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        let mut workers = self.workers.lock();
        let (finished, running): (Vec<_>, Vec<_>) =
            workers.drain(..).partition(|handle| handle.is_finished());
        *workers = running;
        for handle in finished {
            if handle.join().is_err() {
                warn!("rpc worker exited by panic");
            }
        }
        workers.is_empty()
    }

    /// Runs `request` on the calling thread as if a worker had received it.
    ///
    /// A blocking call to a synchronous operation waits for the pump, so the
    /// pumping thread must not use this for synchronous operations.
    pub fn dispatch(&self, request: &Request) -> Reply {
        self.registry.dispatch(request)
    }

    pub fn state(&self) -> Lifecycle {
        *self.state.lock()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Workers currently inside their receive loop.
    pub fn worker_count(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.registry.discipline(name).is_some()
    }

    pub fn discipline(&self, name: &str) -> Option<Discipline> {
        self.registry.discipline(name)
    }

    /// Bound operations sorted by name.
    pub fn methods(&self) -> Vec<(String, Discipline)> {
        self.registry.methods()
    }
}

impl<T: Transport> Drop for Server<T> {
    fn drop(&mut self) {
        self.stop();
        // Workers may be blocked on a sync call nobody will pump; detach those.
        for handle in self.workers.get_mut().drain(..) {
            if handle.is_finished() && handle.join().is_err() {
                warn!("rpc worker exited by panic");
            }
        }
    }
}
