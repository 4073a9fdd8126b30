use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rpc_server::{CallMode, ErrorKind, Response, ResponseError};

use crate::support::{fixture, pump_until, wait_for_pending, SLICE};

/// A blocking call to a synchronous operation parks the caller until another
/// thread pumps, and the pump returns as soon as the queue is empty.
#[test]
fn blocked_add_returns_once_a_separate_thread_pumps() {
    let (client, mut server) = fixture();
    server
        .bind_sync("add", |a: i32, b: i32| -> Response<i32> { Ok(a + b) })
        .unwrap();
    server.async_run(2).unwrap();
    let server = Arc::new(server);

    let caller = thread::spawn(move || client.call_and_wait::<i32, _>("add", &(2, 3)));
    wait_for_pending(&server, 1);
    thread::sleep(Duration::from_millis(20));
    assert!(!caller.is_finished(), "call must not complete without a pump");

    let host = Arc::clone(&server);
    let pump = thread::spawn(move || {
        let started = Instant::now();
        let report = host.sync_run_for(Duration::from_secs(1)).unwrap();
        (report, started.elapsed())
    });

    assert_eq!(caller.join().unwrap().unwrap(), 5);
    let (report, elapsed) = pump.join().unwrap();
    assert_eq!(report.executed, 1);
    assert!(!report.expired);
    assert!(elapsed < Duration::from_millis(500), "pump waited out its slice");
}

/// Blocking calls see exactly the handler's value, and the handler runs once per call.
#[test]
fn blocking_calls_return_the_handler_value_exactly_once() {
    let (client, mut server) = fixture();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    server
        .bind_sync("scale", move |x: i64, by: i64, label: String| -> Response<(String, i64)> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((label, x * by))
        })
        .unwrap();
    server.async_run(2).unwrap();

    let caller = thread::spawn(move || {
        (-3i64..=3)
            .map(|x| {
                client
                    .call_and_wait::<(String, i64), _>("scale", &(x, 7i64, format!("x{x}")))
                    .unwrap()
            })
            .collect::<Vec<_>>()
    });
    let results = pump_until(&server, caller);

    let expected: Vec<_> = (-3i64..=3).map(|x| (format!("x{x}"), x * 7)).collect();
    assert_eq!(results, expected);
    assert_eq!(calls.load(Ordering::SeqCst), expected.len());
}

/// Fire-and-forget returns the ignored-result sentinel before the handler runs,
/// and the handler still runs exactly once when the host pumps.
#[test]
fn fire_and_forget_is_acknowledged_immediately_and_runs_on_pump() {
    let (client, mut server) = fixture();
    let weather = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&weather);
    server
        .bind_sync("set_weather", move |preset: String| -> Response<()> {
            log.lock().push(preset);
            Ok(())
        })
        .unwrap();
    server.async_run(1).unwrap();

    let pending = client
        .call("set_weather", CallMode::FireAndForget, &("HardRainNoon",))
        .unwrap();
    let ack = pending.wait(Duration::from_secs(2)).unwrap();
    assert!(ack.unwrap_err().is_result_ignored());
    wait_for_pending(&server, 1);
    assert!(weather.lock().is_empty());

    let report = server.sync_run_for(Duration::from_millis(100)).unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(*weather.lock(), vec!["HardRainNoon".to_owned()]);

    server.sync_run_for(SLICE).unwrap();
    assert_eq!(weather.lock().len(), 1);
}

/// Synchronous handlers called from several clients never overlap.
#[test]
fn concurrent_sync_calls_never_overlap() {
    let (client, mut server) = fixture();
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let (now, peak) = (Arc::clone(&active), Arc::clone(&max_active));
    server
        .bind_sync("step", move |_client: usize| -> Response<()> {
            let inside = now.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(inside, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            now.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    server.async_run(4).unwrap();

    let callers = thread::spawn(move || {
        let handles: Vec<_> = (0..4usize)
            .map(|id| {
                let client = client.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        client.call_and_wait::<(), _>("step", &(id,)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
    pump_until(&server, callers);

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

/// Calls left queued when a slice expires run first, in order, on the next pump.
#[test]
fn expired_slice_leaves_the_tail_for_the_next_pump_in_order() {
    let (client, mut server) = fixture();
    let order = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&order);
    server
        .bind_sync("frame", move |id: u32| -> Response<()> {
            thread::sleep(Duration::from_millis(10));
            log.lock().push(id);
            Ok(())
        })
        .unwrap();
    // One worker keeps the queue in the order the client sent.
    server.async_run(1).unwrap();

    for id in 0..5u32 {
        client.async_call("frame", &(id,)).unwrap();
    }
    wait_for_pending(&server, 5);

    let first = server.sync_run_for(Duration::from_millis(15)).unwrap();
    assert!(first.expired);
    assert!(first.executed >= 1 && first.executed < 5);
    assert_eq!(first.remaining, 5 - first.executed);

    let second = server.sync_run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(first.executed + second.executed, 5);
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

/// A handler error reaches the blocked caller, and a handler panic does not
/// stop either the pump or the worker that issued the call.
#[test]
fn sync_failures_reach_the_caller_and_the_server_keeps_going() {
    let (client, mut server) = fixture();
    server
        .bind_sync("load_map", |name: String| -> Response<String> {
            if name.starts_with("Town") {
                Ok(name)
            } else {
                Err(ResponseError::new(format!("unknown map {name}")))
            }
        })
        .unwrap();
    server
        .bind_sync("crash", || -> Response<()> { panic!("physics exploded") })
        .unwrap();
    server.async_run(1).unwrap();

    let caller = thread::spawn(move || {
        let missing = client.call_and_wait::<String, _>("load_map", &("Nowhere",));
        let crashed = client.call_and_wait::<(), _>("crash", &());
        let loaded = client.call_and_wait::<String, _>("load_map", &("Town03",));
        (missing, crashed, loaded)
    });
    let (missing, crashed, loaded) = pump_until(&server, caller);

    let missing = missing.unwrap_err();
    let missing = missing.response().expect("handler error");
    assert_eq!(missing.kind(), ErrorKind::Handler);
    assert_eq!(missing.what(), "unknown map Nowhere");

    let crashed = crashed.unwrap_err();
    assert_eq!(crashed.response().map(|e| e.kind()), Some(ErrorKind::Internal));

    assert_eq!(loaded.unwrap(), "Town03");
    assert_eq!(server.worker_count(), 1);
}
