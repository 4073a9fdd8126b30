use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rpc_server::{Server, ServerConfig};
use transport::{loopback, LoopbackClient, LoopbackListener};

pub(crate) type TestServer = Server<LoopbackListener>;

pub(crate) const SLICE: Duration = Duration::from_millis(5);

pub(crate) fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unstarted server with a fast-polling config, plus a client wired to it.
pub(crate) fn fixture() -> (LoopbackClient, TestServer) {
    init_logs();
    let (client, listener) = loopback();
    let config = ServerConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_thread_name("e2e-worker");
    (client, Server::with_config(listener, config))
}

/// Pumps in short slices on the current thread until `caller` finishes.
pub(crate) fn pump_until<R>(server: &TestServer, caller: JoinHandle<R>) -> R {
    while !caller.is_finished() {
        server.sync_run_for(SLICE).expect("only this thread pumps");
    }
    caller.join().expect("caller thread panicked")
}

/// Blocks until at least `count` synchronous calls are queued.
pub(crate) fn wait_for_pending(server: &TestServer, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.pending_sync_calls() < count {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {count} queued call(s)"
        );
        thread::sleep(Duration::from_millis(1));
    }
}
