use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, trace, warn};
use sync_context::panic_message;
use transport::{Inbound, InboundCall, Reply, ResponseError, Transport};

use crate::procedure::Registry;

/// State shared between the server and every worker thread.
pub(crate) struct WorkerShared<T> {
    pub(crate) transport: Arc<T>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) live: Arc<AtomicUsize>,
    pub(crate) poll_interval: Duration,
}

impl<T> Clone for WorkerShared<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            registry: Arc::clone(&self.registry),
            stop: Arc::clone(&self.stop),
            live: Arc::clone(&self.live),
            poll_interval: self.poll_interval,
        }
    }
}

struct LiveGuard<'a>(&'a AtomicUsize);

impl<'a> LiveGuard<'a> {
    fn enter(live: &'a AtomicUsize) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self(live)
    }
}

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Receives and serves calls until the stop flag is raised or the transport closes.
pub(crate) fn run<T: Transport>(shared: WorkerShared<T>) {
    let _live = LiveGuard::enter(&shared.live);
    trace!("rpc worker started");

    while !shared.stop.load(Ordering::Acquire) {
        match shared.transport.next_call(shared.poll_interval) {
            Inbound::Call(call) => serve(&shared.registry, call),
            Inbound::Idle => {}
            Inbound::Closed => {
                debug!("transport closed; rpc worker exiting");
                break;
            }
        }
    }

    trace!("rpc worker stopped");
}

fn serve(registry: &Registry, call: InboundCall) {
    let reply = invoke(registry, &call);

    if !call.expects_reply() {
        if let Err(err) = &reply {
            if !err.is_result_ignored() {
                warn!("call to {:?} failed with no caller waiting: {err}", call.method());
            }
        }
        return;
    }

    let method = call.method().to_owned();
    if !call.respond(reply) {
        trace!("caller of {method:?} went away before the reply");
    }
}

fn invoke(registry: &Registry, call: &InboundCall) -> Reply {
    match panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch(call.request()))) {
        Ok(reply) => reply,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("handler for {:?} panicked: {message}", call.method());
            Err(ResponseError::internal(format!("handler panicked: {message}")))
        }
    }
}
