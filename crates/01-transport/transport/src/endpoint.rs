use std::time::Duration;

use crossbeam_channel::Sender;

use crate::wire::{CallMode, Reply, Request};

/// Source of inbound calls serviced by the dispatch server's worker threads.
///
/// Implementations must be shareable across the worker pool; each worker calls
/// [`Transport::next_call`] in a loop and checks its stop flag between calls.
pub trait Transport: Send + Sync + 'static {
    /// Waits up to `timeout` for the next inbound call.
    fn next_call(&self, timeout: Duration) -> Inbound;
}

/// Outcome of polling a [`Transport`] for work.
#[derive(Debug)]
pub enum Inbound {
    /// A call is ready to dispatch.
    Call(InboundCall),
    /// Nothing arrived within the timeout.
    Idle,
    /// The transport will never deliver another call.
    Closed,
}

/// A received call together with the sink its reply goes to.
#[derive(Debug)]
pub struct InboundCall {
    request: Request,
    reply_to: Option<Sender<Reply>>,
}

impl InboundCall {
    /// `reply_to` is `None` when the caller discards the reply.
    pub fn new(request: Request, reply_to: Option<Sender<Reply>>) -> Self {
        Self { request, reply_to }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn mode(&self) -> CallMode {
        self.request.mode
    }

    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Delivers `reply` to the caller. Returns `false` when nobody is listening.
    pub fn respond(self, reply: Reply) -> bool {
        match self.reply_to {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }
}
