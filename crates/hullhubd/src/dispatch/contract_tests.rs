//! Behaviour shared by both dispatch cores.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hullhub_config::DispatchStrategy;
use rstest::rstest;

use super::test_support::{
    EchoHandler, PanickingHandler, SelfDeregistering, sees_eof, socket_pair,
};
use super::{DispatchCore, DispatchError, ReadinessLoop, WorkerPerConnection};
use crate::tests::support::eventually;

const TICK: Duration = Duration::from_millis(20);

fn started(strategy: DispatchStrategy) -> Arc<dyn DispatchCore> {
    let core: Arc<dyn DispatchCore> = match strategy {
        DispatchStrategy::Reactor => Arc::new(ReadinessLoop::new(TICK)),
        DispatchStrategy::Proactor => Arc::new(WorkerPerConnection::new(TICK, Duration::from_secs(1))),
    };
    core.start_all().expect("start core");
    core
}

fn echo(client: &mut std::net::TcpStream, text: &[u8]) -> Vec<u8> {
    client.write_all(text).expect("write");
    let mut reply = vec![0_u8; text.len()];
    client.read_exact(&mut reply).expect("read echo");
    reply
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn services_a_connection_until_it_closes(#[case] strategy: DispatchStrategy) {
    let core = started(strategy);
    let (server, mut client) = socket_pair();
    let handler = Arc::new(EchoHandler::default());
    core.register(server, Arc::clone(&handler) as _)
        .expect("register");

    assert_eq!(echo(&mut client, b"ping\n"), b"ping\n");
    assert_eq!(echo(&mut client, b"again\n"), b"again\n");
    assert_eq!(core.active(), 1);

    client.write_all(b"bye\n").expect("write bye");
    assert!(sees_eof(&mut client));
    assert!(eventually(|| core.active() == 0));
    assert_eq!(handler.closes(), 1);
    core.stop_all().expect("stop core");
    assert_eq!(handler.closes(), 1);
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn peer_hangup_runs_on_close_once(#[case] strategy: DispatchStrategy) {
    let core = started(strategy);
    let (server, client) = socket_pair();
    let handler = Arc::new(EchoHandler::default());
    core.register(server, Arc::clone(&handler) as _)
        .expect("register");

    drop(client);
    assert!(eventually(|| handler.closes() == 1));
    assert!(eventually(|| core.active() == 0));
    core.stop_all().expect("stop core");
    assert_eq!(handler.closes(), 1);
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn handlers_may_deregister_themselves(#[case] strategy: DispatchStrategy) {
    let core = started(strategy);
    let (server, mut client) = socket_pair();
    let handler = Arc::new(SelfDeregistering::new(Arc::clone(&core)));
    let token = core
        .register(server, Arc::clone(&handler) as _)
        .expect("register");
    handler.bind(token);

    client.write_all(b"leave\n").expect("write");
    assert!(eventually(|| handler.closes() == 1));
    assert!(sees_eof(&mut client));
    assert_eq!(core.active(), 0);
    assert!(!core.deregister(token));
    core.stop_all().expect("stop core");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn a_panicking_handler_only_loses_its_own_connection(#[case] strategy: DispatchStrategy) {
    let core = started(strategy);
    let (bad_server, mut bad_client) = socket_pair();
    let (good_server, mut good_client) = socket_pair();
    let bad = Arc::new(PanickingHandler::default());
    let good = Arc::new(EchoHandler::default());
    core.register(bad_server, Arc::clone(&bad) as _)
        .expect("register bad");
    core.register(good_server, Arc::clone(&good) as _)
        .expect("register good");

    bad_client.write_all(b"boom\n").expect("write");
    assert!(sees_eof(&mut bad_client));
    assert!(eventually(|| bad.closes() == 1));

    assert_eq!(echo(&mut good_client, b"still here\n"), b"still here\n");
    assert_eq!(core.active(), 1);
    core.stop_all().expect("stop core");
    assert_eq!(good.closes(), 1);
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn stop_all_closes_every_connection(#[case] strategy: DispatchStrategy) {
    let core = started(strategy);
    let mut clients = Vec::new();
    let mut handlers = Vec::new();
    for _ in 0..3 {
        let (server, client) = socket_pair();
        let handler = Arc::new(EchoHandler::default());
        core.register(server, Arc::clone(&handler) as _)
            .expect("register");
        clients.push(client);
        handlers.push(handler);
    }

    let started_at = Instant::now();
    core.stop_all().expect("stop core");
    assert!(started_at.elapsed() < Duration::from_secs(2));

    assert_eq!(core.active(), 0);
    assert!(handlers.iter().all(|handler| handler.closes() == 1));
    assert!(clients.iter_mut().all(sees_eof));

    let (server, _client) = socket_pair();
    let refused = core.register(server, Arc::new(EchoHandler::default()));
    assert!(matches!(refused, Err(DispatchError::NotRunning)));
}

#[rstest]
#[case::reactor(Arc::new(ReadinessLoop::new(TICK)) as Arc<dyn DispatchCore>)]
#[case::proactor(Arc::new(WorkerPerConnection::new(TICK, TICK)) as Arc<dyn DispatchCore>)]
fn registration_requires_a_started_core(#[case] core: Arc<dyn DispatchCore>) {
    let (server, _client) = socket_pair();
    let refused = core.register(server, Arc::new(EchoHandler::default()));
    assert!(matches!(refused, Err(DispatchError::NotRunning)));
}

#[rstest]
fn stopping_one_worker_interrupts_a_blocked_read() {
    let core = WorkerPerConnection::new(Duration::from_secs(30), Duration::from_secs(1));
    core.start_all().expect("start");
    let (server, mut client) = socket_pair();
    let handler = Arc::new(EchoHandler::default());
    let token = core
        .register(server, Arc::clone(&handler) as _)
        .expect("register");

    let started_at = Instant::now();
    assert!(core.stop(token));
    assert!(started_at.elapsed() < Duration::from_secs(5));
    assert_eq!(handler.closes(), 1);
    assert!(sees_eof(&mut client));
    assert!(!core.stop(token));
}

#[rstest]
fn readiness_loop_deregisters_from_another_thread() {
    let core = ReadinessLoop::new(TICK);
    core.start_all().expect("start");
    let (server, mut client) = socket_pair();
    let handler = Arc::new(EchoHandler::default());
    let token = core
        .register(server, Arc::clone(&handler) as _)
        .expect("register");

    assert!(core.deregister(token));
    assert_eq!(handler.closes(), 1);
    assert!(sees_eof(&mut client));
    core.stop_all().expect("stop");
    assert_eq!(handler.closes(), 1);
}
