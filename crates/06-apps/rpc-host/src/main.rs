//! Simulated host loop serving RPC clients over the in-process transport.
//!
//! The host owns a tiny world (a frame counter and a weather preset). Clients
//! read and mutate it through synchronous operations, which only run inside
//! the host's per-tick pump slice, while asynchronous operations are answered
//! directly by the worker threads.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rpc_server::{Response, ResponseError, Server, ServerConfig};
use transport::{loopback, ClientError, LoopbackClient, LoopbackListener};

#[derive(Parser, Debug)]
#[command(author, version, about = "Host loop pumping synchronous RPC calls")]
struct Args {
    /// Worker threads receiving calls
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Length of one host tick in milliseconds
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,

    /// Share of each tick spent running synchronous calls, in milliseconds
    #[arg(long, default_value_t = 5)]
    slice_ms: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Concurrent client threads
    #[arg(long, default_value_t = 4)]
    clients: usize,

    /// Enable debug logging unless RUST_LOG is set
    #[arg(long, short)]
    verbose: bool,
}

/// State only touched from the host thread.
#[derive(Debug, Default)]
struct World {
    frame: u64,
    weather: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.slice_ms > args.tick_ms {
        bail!(
            "slice of {}ms does not fit in a {}ms tick",
            args.slice_ms,
            args.tick_ms
        );
    }

    let world = Arc::new(Mutex::new(World {
        frame: 0,
        weather: "ClearNoon".into(),
    }));
    let (client, listener) = loopback();
    let server = build_server(listener, &args, &world)?;
    server
        .async_run(args.workers)
        .context("failed to start rpc workers")?;

    let clients: Vec<_> = (0..args.clients)
        .map(|id| {
            let client = client.clone();
            thread::Builder::new()
                .name(format!("client-{id}"))
                .spawn(move || run_client(id, client))
                .with_context(|| format!("failed to spawn client {id}"))
        })
        .collect::<Result<_>>()?;
    drop(client);

    let tick = Duration::from_millis(args.tick_ms);
    let slice = Duration::from_millis(args.slice_ms);
    let mut executed = 0;
    for _ in 0..args.ticks {
        let started = Instant::now();
        world.lock().frame += 1;

        let report = server.sync_run_for(slice)?;
        executed += report.executed;
        if report.expired {
            debug!("pump slice expired with {} call(s) queued", report.remaining);
        }

        if let Some(rest) = tick.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    server.stop();
    // Release workers still blocked on a synchronous call.
    while !server.join_workers(slice) {
        executed += server.sync_run_for(slice)?.executed;
    }
    // Calls still queued on the listener fail fast once it is dropped.
    drop(server);

    let mut answered = 0;
    for handle in clients {
        answered += handle
            .join()
            .map_err(|_| anyhow!("client thread panicked"))?;
    }

    let world = world.lock();
    info!(
        "ran {} tick(s): {executed} synchronous call(s), {answered} client reply(ies), weather {:?}",
        world.frame, world.weather
    );
    Ok(())
}

fn build_server(
    listener: LoopbackListener,
    args: &Args,
    world: &Arc<Mutex<World>>,
) -> Result<Server<LoopbackListener>> {
    let config = ServerConfig::default().with_worker_threads(args.workers);
    config.validate()?;
    let mut server = Server::with_config(listener, config);

    server.bind_async("version", || -> Response<&'static str> {
        Ok(env!("CARGO_PKG_VERSION"))
    })?;
    server.bind_sync("add", |a: i64, b: i64| -> Response<i64> {
        a.checked_add(b)
            .ok_or_else(|| ResponseError::new("integer overflow"))
    })?;

    let frames = Arc::clone(world);
    server.bind_sync("get_frame", move || -> Response<u64> {
        Ok(frames.lock().frame)
    })?;

    let weather = Arc::clone(world);
    server.bind_sync("set_weather", move |preset: String| -> Response<()> {
        if preset.is_empty() {
            return Err(ResponseError::new("weather preset must not be empty"));
        }
        weather.lock().weather = preset;
        Ok(())
    })?;

    Ok(server)
}

/// Issues a short burst of calls and returns how many were answered.
fn run_client(id: usize, client: LoopbackClient) -> usize {
    let mut answered = 0;
    let mut record = |result: Result<(), ClientError>, what: &str| match result {
        Ok(()) => answered += 1,
        Err(err) => warn!("client {id}: {what} failed: {err}"),
    };

    record(
        client
            .call_and_wait::<String, _>("version", &())
            .map(|v| debug!("client {id}: server version {v}")),
        "version",
    );

    for round in 0..3i64 {
        record(
            client
                .call_and_wait::<i64, _>("add", &(id as i64, round))
                .map(|sum| debug!("client {id}: {id} + {round} = {sum}")),
            "add",
        );
        record(
            client
                .call_and_wait::<u64, _>("get_frame", &())
                .map(|frame| debug!("client {id}: observed frame {frame}")),
            "get_frame",
        );
    }

    let preset = if id % 2 == 0 { "WetCloudySunset" } else { "HardRainNoon" };
    if let Err(err) = client.async_call("set_weather", &(preset,)) {
        warn!("client {id}: set_weather was not sent: {err}");
    }

    answered
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
