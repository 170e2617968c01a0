//! End-to-end behaviour of a running service over real sockets.

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use hullhub_config::{DispatchStrategy, SocketEndpoint};

use super::support::{
    HealthEvent, LineClient, RecordingCrossingSink, RecordingHealthReporter, eventually,
};
use crate::monitor::Crossing;
use crate::service::{Service, ServiceError, ServiceSettings};
use crate::transport::ListenerError;

const TICK: Duration = Duration::from_millis(20);

struct Running {
    service: Service,
    reporter: Arc<RecordingHealthReporter>,
    sink: Arc<RecordingCrossingSink>,
}

impl Running {
    fn start(settings: ServiceSettings) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let sink = Arc::new(RecordingCrossingSink::default());
        let service = Service::start(
            &settings.with_tick(TICK),
            Arc::clone(&sink) as _,
            Arc::clone(&reporter) as _,
        )
        .expect("start service");
        Self {
            service,
            reporter,
            sink,
        }
    }

    fn tcp(strategy: DispatchStrategy) -> Self {
        Self::start(
            ServiceSettings::new(SocketEndpoint::tcp("127.0.0.1", 0)).with_strategy(strategy),
        )
    }

    fn client(&self) -> LineClient {
        LineClient::tcp(self.service.local_addr().expect("tcp address"))
    }
}

fn triangle_scenario(client: &mut LineClient) {
    assert_eq!(client.ask("Newgraph 3"), "Enter 3 points (x,y):");
    assert_eq!(client.ask("0,0"), "Point 1 accepted");
    assert_eq!(client.ask("4,0"), "Point 2 accepted");
    assert_eq!(client.ask("0,3"), "Point 3 accepted");
    assert_eq!(client.line(), "Graph created with 3 points");
    assert_eq!(client.ask("CH"), "6.0");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn computes_the_hull_of_an_entered_graph(#[case] strategy: DispatchStrategy) {
    let running = Running::tcp(strategy);
    let mut client = running.client();

    triangle_scenario(&mut client);
    assert_eq!(client.ask("Newpoint 4,3"), "Point added");
    assert_eq!(client.ask("CH"), "12.0");
    assert_eq!(client.ask("Removepoint 4,3"), "Point removed");
    assert_eq!(client.ask("Removepoint 4,3"), "Point not found");
    assert_eq!(client.ask("Frobnicate"), "Error: Unknown command");

    running.service.shutdown().expect("shutdown");
}

#[rstest]
fn serves_clients_over_a_unix_socket() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("run").join("hullhubd.sock");
    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_owned());
    let running = Running::start(ServiceSettings::new(endpoint));
    assert_eq!(running.service.local_addr(), None);

    let mut client = LineClient::unix(&path);
    triangle_scenario(&mut client);

    running.service.shutdown().expect("shutdown");
    assert!(!path.exists(), "socket file should be removed");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn exit_ends_the_session(#[case] strategy: DispatchStrategy) {
    let running = Running::tcp(strategy);
    let mut client = running.client();

    assert_eq!(client.ask("exit"), "Goodbye!");
    assert!(client.is_closed());
    assert!(eventually(|| running.service.active_connections() == 0));
    assert!(eventually(|| running.service.executor().session_count() == 0));

    let events = running.reporter.events();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, HealthEvent::SessionClosed(_)))
            .count(),
        1
    );
    running.service.shutdown().expect("shutdown");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn a_vanished_holder_hands_the_graph_to_waiting_clients(#[case] strategy: DispatchStrategy) {
    let running = Running::tcp(strategy);
    let mut alice = running.client();
    let mut bob = running.client();

    assert_eq!(alice.ask("Newgraph 3"), "Enter 3 points (x,y):");
    assert_eq!(alice.ask("1,1"), "Point 1 accepted");
    assert_eq!(bob.ask("CH"), "Command queued (position 1)");

    alice.hang_up();
    assert_eq!(bob.line(), "0.0");
    assert_eq!(running.service.executor().lock_holder(), None);
    assert_eq!(
        running.service.executor().points(),
        [crate::graph::Point::new(1.0, 1.0)]
    );
    running.service.shutdown().expect("shutdown");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn exit_during_point_entry_frees_the_graph(#[case] strategy: DispatchStrategy) {
    let running = Running::tcp(strategy);
    let mut alice = running.client();
    let mut bob = running.client();

    assert_eq!(alice.ask("Newgraph 3"), "Enter 3 points (x,y):");
    assert_eq!(bob.ask("CH"), "Command queued (position 1)");

    assert_eq!(alice.ask("quit"), "Goodbye!");
    assert!(alice.is_closed());
    assert_eq!(bob.line(), "0.0");
    assert!(eventually(|| running.service.executor().session_count() == 1));
    assert_eq!(running.service.executor().lock_holder(), None);
    running.service.shutdown().expect("shutdown");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn crossings_reach_the_watcher(#[case] strategy: DispatchStrategy) {
    let running = Running::start(
        ServiceSettings::new(SocketEndpoint::tcp("127.0.0.1", 0))
            .with_strategy(strategy)
            .with_area_threshold(10.0),
    );
    let mut client = running.client();

    client.script(&["Newgraph 4", "0,0", "4,0", "4,4"]);
    assert_eq!(client.ask("0,4"), "Point 4 accepted");
    assert_eq!(client.line(), "Graph created with 4 points");
    assert_eq!(client.ask("CH"), "16.0");
    client.script(&["Newgraph 3", "0,0", "1,0"]);
    assert_eq!(client.ask("0,1"), "Point 3 accepted");
    assert_eq!(client.line(), "Graph created with 3 points");

    assert!(eventually(|| running.sink.crossings().len() == 2));
    assert_eq!(running.sink.crossings(), [Crossing::Rose, Crossing::Fell]);
    assert_eq!(running.sink.metrics(), [16.0, 0.5]);
    running.service.shutdown().expect("shutdown");
}

#[rstest]
#[case::reactor(DispatchStrategy::Reactor)]
#[case::proactor(DispatchStrategy::Proactor)]
fn shutdown_releases_a_held_graph(#[case] strategy: DispatchStrategy) {
    let Running {
        service, reporter, ..
    } = Running::tcp(strategy);
    let mut alice = LineClient::tcp(service.local_addr().expect("tcp address"));
    let mut bob = LineClient::tcp(service.local_addr().expect("tcp address"));

    alice.script(&["Newgraph 5", "0,0"]);
    assert_eq!(bob.ask("CH"), "Command queued (position 1)");
    let executor = Arc::clone(service.executor());
    assert!(executor.lock_holder().is_some());

    service.shutdown().expect("shutdown");
    assert_eq!(executor.lock_holder(), None);
    assert!(executor.queued().is_empty());
    assert_eq!(executor.session_count(), 0);
    assert!(alice.is_closed());
    assert!(bob.is_closed());
    assert_eq!(
        reporter.lifecycle(),
        [
            HealthEvent::Starting(strategy),
            HealthEvent::Ready,
            HealthEvent::Stopped
        ]
    );
}

#[rstest]
fn a_busy_port_fails_startup() {
    let first = Running::tcp(DispatchStrategy::Reactor);
    let port = first.service.local_addr().expect("tcp address").port();

    let reporter = Arc::new(RecordingHealthReporter::default());
    let settings = ServiceSettings::new(SocketEndpoint::tcp("127.0.0.1", port));
    let outcome = Service::start(
        &settings,
        Arc::new(RecordingCrossingSink::default()),
        Arc::clone(&reporter) as _,
    );

    assert!(matches!(
        outcome,
        Err(ServiceError::Listener(ListenerError::BindTcp { .. }))
    ));
    let lifecycle = reporter.lifecycle();
    assert_eq!(lifecycle.len(), 2);
    assert_eq!(lifecycle[0], HealthEvent::Starting(DispatchStrategy::Proactor));
    assert!(matches!(lifecycle[1], HealthEvent::Failed(_)));
    first.service.shutdown().expect("shutdown");
}
