//! In-process transport pairing a client handle with a server-side listener.
//!
//! Calls travel over an unbounded crossbeam channel; each blocking call carries
//! its own single-slot reply channel.

use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::trace;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::endpoint::{Inbound, InboundCall, Transport};
use crate::error::ClientError;
use crate::wire::{CallMode, Reply, Request};

/// Reply timeout applied by a fresh [`LoopbackClient`].
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates a connected client/listener pair.
pub fn loopback() -> (LoopbackClient, LoopbackListener) {
    let (tx, rx) = unbounded();
    (
        LoopbackClient {
            calls: tx,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        },
        LoopbackListener { calls: rx },
    )
}

/// Caller-side handle. Cheap to clone; every clone feeds the same listener.
#[derive(Clone, Debug)]
pub struct LoopbackClient {
    calls: Sender<InboundCall>,
    timeout: Duration,
}

impl LoopbackClient {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Sends a call in `mode` and returns a handle to its reply.
    pub fn call<A>(&self, method: &str, mode: CallMode, args: &A) -> Result<PendingReply, ClientError>
    where
        A: Serialize + ?Sized,
    {
        let payload = codec::encode(args)?;
        self.call_raw(Request::new(method, mode, payload))
    }

    /// Sends an already-encoded request and returns a handle to its reply.
    pub fn call_raw(&self, request: Request) -> Result<PendingReply, ClientError> {
        let (tx, rx) = bounded(1);
        trace!("loopback call {} ({:?})", request.method, request.mode);
        self.calls
            .send(InboundCall::new(request, Some(tx)))
            .map_err(|_| ClientError::Disconnected)?;
        Ok(PendingReply { reply: rx })
    }

    /// Blocking call: waits up to the client timeout and decodes the result.
    pub fn call_and_wait<T, A>(&self, method: &str, args: &A) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let pending = self.call(method, CallMode::Blocking, args)?;
        let payload = pending.wait(self.timeout)??;
        Ok(codec::decode(&payload)?)
    }

    /// Fire-and-forget call: the reply, if any, is discarded.
    pub fn async_call<A>(&self, method: &str, args: &A) -> Result<(), ClientError>
    where
        A: Serialize + ?Sized,
    {
        let payload = codec::encode(args)?;
        trace!("loopback async call {method}");
        self.calls
            .send(InboundCall::new(
                Request::new(method, CallMode::FireAndForget, payload),
                None,
            ))
            .map_err(|_| ClientError::Disconnected)
    }
}

/// Reply slot for one outstanding call.
#[derive(Debug)]
pub struct PendingReply {
    reply: Receiver<Reply>,
}

impl PendingReply {
    /// Waits up to `timeout` for the encoded reply.
    pub fn wait(&self, timeout: Duration) -> Result<Reply, ClientError> {
        match self.reply.recv_timeout(timeout) {
            Ok(reply) => Ok(reply),
            Err(RecvTimeoutError::Timeout) => Err(ClientError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Disconnected),
        }
    }

    /// Returns the reply if it has already arrived.
    pub fn try_take(&self) -> Option<Reply> {
        self.reply.try_recv().ok()
    }
}

/// Server-side end of a [`loopback`] pair.
#[derive(Debug)]
pub struct LoopbackListener {
    calls: Receiver<InboundCall>,
}

impl LoopbackListener {
    /// Number of calls waiting for a worker.
    pub fn backlog(&self) -> usize {
        self.calls.len()
    }
}

impl Transport for LoopbackListener {
    fn next_call(&self, timeout: Duration) -> Inbound {
        match self.calls.recv_timeout(timeout) {
            Ok(call) => Inbound::Call(call),
            Err(RecvTimeoutError::Timeout) => Inbound::Idle,
            Err(RecvTimeoutError::Disconnected) => Inbound::Closed,
        }
    }
}
