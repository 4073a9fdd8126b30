use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rpc_server::{Discipline, ErrorKind, Lifecycle, Response, ServerError};
use transport::ClientError;

use crate::support::{fixture, wait_for_pending};

#[test]
fn binding_and_starting_follow_the_lifecycle() {
    let (_client, mut server) = fixture();
    assert_eq!(server.state(), Lifecycle::Unstarted);
    server
        .bind_sync("get_frame", || -> Response<u64> { Ok(0) })
        .unwrap();

    server.async_run(2).unwrap();
    assert_eq!(server.state(), Lifecycle::Running);
    assert!(matches!(server.async_run(2), Err(ServerError::AlreadyStarted)));
    assert!(matches!(
        server.bind_async("version", || -> Response<u8> { Ok(1) }),
        Err(ServerError::BindAfterStart(_))
    ));
    assert_eq!(
        server.methods(),
        vec![("get_frame".to_owned(), Discipline::Synchronous)]
    );

    server.stop();
    assert_eq!(server.state(), Lifecycle::Stopped);
    server.stop();
    assert_eq!(server.state(), Lifecycle::Stopped);
}

#[test]
fn unknown_operations_are_answered_with_an_error() {
    let (client, server) = fixture();
    server.async_run(1).unwrap();

    let err = client.call_and_wait::<(), _>("destroy_actor", &(7u32,)).unwrap_err();
    assert_eq!(err.response().map(|e| e.kind()), Some(ErrorKind::UnknownMethod));
}

#[test]
fn stop_ends_workers_while_accepted_sync_calls_still_complete() {
    let (client, mut server) = fixture();
    server
        .bind_sync("add", |a: i32, b: i32| -> Response<i32> { Ok(a + b) })
        .unwrap();
    server.async_run(1).unwrap();

    let caller = thread::spawn(move || client.call_and_wait::<i32, _>("add", &(20, 22)));
    wait_for_pending(&server, 1);

    server.stop();
    assert!(
        !server.join_workers(Duration::from_millis(20)),
        "worker is still blocked on its sync call"
    );

    let report = server.sync_run_for(Duration::from_millis(100)).unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(caller.join().unwrap().unwrap(), 42);
    assert!(server.join_workers(Duration::from_secs(2)));
    assert_eq!(server.worker_count(), 0);
}

#[test]
fn workers_exit_when_every_client_is_gone() {
    let (client, server) = fixture();
    server.async_run(3).unwrap();
    drop(client);

    assert!(server.join_workers(Duration::from_secs(2)));
    assert_eq!(server.state(), Lifecycle::Running);
}

#[test]
fn calls_fail_fast_once_the_server_is_dropped() {
    let (mut client, server) = fixture();
    client.set_timeout(Duration::from_secs(5));
    server.async_run(1).unwrap();
    server.stop();
    assert!(server.join_workers(Duration::from_secs(2)));
    drop(server);

    let err = client.call_and_wait::<(), _>("anything", &()).unwrap_err();
    assert!(matches!(err, ClientError::Disconnected));
}

/// Stopping the server gates inbound calls only; a host pump already in
/// progress keeps draining the sync queue to the end.
#[test]
fn stop_does_not_cut_a_running_pump_short() {
    let (client, mut server) = fixture();
    server
        .bind_sync("settle", || -> Response<()> {
            thread::sleep(Duration::from_millis(30));
            Ok(())
        })
        .unwrap();
    server.async_run(1).unwrap();

    for _ in 0..5 {
        client.async_call("settle", &()).unwrap();
    }
    wait_for_pending(&server, 5);
    let server = Arc::new(server);

    let host = Arc::clone(&server);
    let pump = thread::spawn(move || host.sync_run_for(Duration::from_secs(5)));
    thread::sleep(Duration::from_millis(10));
    server.stop();

    let report = pump.join().unwrap().unwrap();
    assert!(!report.stopped);
    assert_eq!(report.executed, 5);
    assert_eq!(report.remaining, 0);
    assert_eq!(server.state(), Lifecycle::Stopped);
}
