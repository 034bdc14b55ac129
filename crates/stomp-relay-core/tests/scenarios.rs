//! End-to-end scenarios driving a `RelayController` against an in-memory
//! fake `TcpClient`/`TcpConnection`, the same way the transport crate's
//! tests drive a fake instead of a real socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use stomp_relay_core::{BrokerEvent, RelayConfig, RelayController, RelayError};
use stomp_relay_protocol::{HeaderAccessor, HeartBeat, Message, StompCommand};
use stomp_relay_transport::{InactivityWatchdog, ReconnectStrategy, SessionEvents, TcpClient, TcpConnection, TransportError, TransportResult};

#[derive(Default)]
struct CapturingConnection {
    sent: StdMutex<Vec<Message>>,
}

impl CapturingConnection {
    fn sent_commands(&self) -> Vec<Option<StompCommand>> {
        self.sent.lock().unwrap().iter().map(Message::command).collect()
    }
}

#[async_trait]
impl TcpConnection for CapturingConnection {
    async fn send(&self, message: Message) -> TransportResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
    async fn close(&self) {}
    fn on_write_inactivity(&self, _watchdog: Arc<dyn InactivityWatchdog>, _interval: Duration) {}
    fn on_read_inactivity(&self, _watchdog: Arc<dyn InactivityWatchdog>, _interval: Duration) {}
}

/// Records every handler handed to `connect`/`connect_with_reconnect`
/// instead of dialing a real socket; tests drive the captured handler's
/// `SessionEvents` callbacks directly to simulate TCP/STOMP lifecycle
/// events.
#[derive(Default)]
struct RecordingTcpClient {
    handlers: StdMutex<Vec<Arc<dyn SessionEvents>>>,
    connect_calls: AtomicUsize,
}

impl RecordingTcpClient {
    fn last_handler(&self) -> Arc<dyn SessionEvents> {
        self.handlers.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl TcpClient for RecordingTcpClient {
    async fn connect(&self, handler: Arc<dyn SessionEvents>) -> TransportResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().unwrap().push(handler);
        Ok(())
    }

    async fn connect_with_reconnect(&self, handler: Arc<dyn SessionEvents>, _strategy: ReconnectStrategy) -> TransportResult<()> {
        self.handlers.lock().unwrap().push(handler);
        Ok(())
    }

    async fn shutdown(&self) -> TransportResult<()> {
        Ok(())
    }
}

fn connect_message(session_id: &str) -> Message {
    let mut headers = HeaderAccessor::new();
    let _ = headers.set_command(StompCommand::Connect);
    let _ = headers.set_session_id(session_id);
    Message::empty(headers)
}

fn connected_message(heart_beat: HeartBeat) -> Message {
    let mut headers = HeaderAccessor::new();
    let _ = headers.set_command(StompCommand::Connected);
    let _ = headers.set_heart_beat(heart_beat);
    Message::empty(headers)
}

fn send_message(session_id: Option<&str>, destination: &str, payload: &'static [u8]) -> Message {
    let mut headers = HeaderAccessor::new();
    let _ = headers.set_command(StompCommand::Send);
    if let Some(id) = session_id {
        let _ = headers.set_session_id(id);
    }
    let _ = headers.set("destination", destination);
    Message::new(Bytes::from_static(payload), headers)
}

fn disconnect_message(session_id: &str) -> Message {
    let mut headers = HeaderAccessor::new();
    let _ = headers.set_command(StompCommand::Disconnect);
    let _ = headers.set_session_id(session_id);
    Message::empty(headers)
}

/// Lets every task spawned by a `dispatch` call (the `tokio::spawn` that
/// hands the new session to the TCP client) actually run before the test
/// inspects the result.
async fn let_spawned_tasks_run() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn s1_happy_path_client_session() {
    let mut config = RelayConfig::default();
    config.destination_prefixes = vec!["/topic/".to_string()];
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, _outbound_rx) = RelayController::new(config, tcp_client.clone()).unwrap();

    controller.dispatch(connect_message("A")).await.unwrap();
    let_spawned_tasks_run().await;
    assert!(controller.is_session_registered("A"));

    let handler = tcp_client.last_handler();
    let conn = Arc::new(CapturingConnection::default());
    handler.after_connected(conn.clone()).await;
    handler.handle_message(connected_message(HeartBeat::disabled())).await;

    controller
        .dispatch(send_message(Some("A"), "/topic/x", b"hi"))
        .await
        .unwrap();

    assert_eq!(conn.sent_commands(), vec![Some(StompCommand::Connect), Some(StompCommand::Send)]);
    let sent = conn.sent.lock().unwrap();
    assert_eq!(sent[0].headers.login(), Some("guest"));
    assert_eq!(sent[0].headers.passcode(), Some("guest"));
    assert_eq!(sent[1].headers.destination(), Some("/topic/x"));
}

#[tokio::test]
async fn s2_destination_prefix_rejection() {
    let mut config = RelayConfig::default();
    config.destination_prefixes = vec!["/topic/".to_string()];
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, mut outbound_rx) = RelayController::new(config, tcp_client.clone()).unwrap();

    controller.dispatch(connect_message("A")).await.unwrap();
    let_spawned_tasks_run().await;

    let handler = tcp_client.last_handler();
    let conn = Arc::new(CapturingConnection::default());
    handler.after_connected(conn.clone()).await;
    handler.handle_message(connected_message(HeartBeat::disabled())).await;

    controller.dispatch(send_message(Some("A"), "/queue/y", b"hi")).await.unwrap();

    assert_eq!(conn.sent_commands(), vec![Some(StompCommand::Connect)]);
    assert!(outbound_rx.try_recv().is_err());
}

#[tokio::test]
async fn s3_forward_before_connected_is_a_no_op() {
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, _outbound_rx) = RelayController::new(RelayConfig::default(), tcp_client.clone()).unwrap();

    controller.dispatch(connect_message("A")).await.unwrap();
    let_spawned_tasks_run().await;

    let handler = tcp_client.last_handler();
    let conn = Arc::new(CapturingConnection::default());
    handler.after_connected(conn.clone()).await;

    let result = controller.dispatch(send_message(Some("A"), "/topic/x", b"hi")).await;
    assert!(result.is_ok());
    assert_eq!(conn.sent_commands(), vec![Some(StompCommand::Connect)]);
}

#[tokio::test]
async fn s4_system_session_failure_publishes_unavailable() {
    let mut config = RelayConfig::default();
    config.system_heartbeat_send_interval_ms = 10_000;
    config.system_heartbeat_receive_interval_ms = 10_000;
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, _outbound_rx) = RelayController::new(config, tcp_client.clone()).unwrap();
    let mut availability_rx = controller.availability().subscribe();

    controller.start().await;
    let_spawned_tasks_run().await;

    let handler = tcp_client.last_handler();
    let conn = Arc::new(CapturingConnection::default());
    handler.after_connected(conn.clone()).await;
    handler.handle_message(connected_message(HeartBeat::new(5_000, 5_000))).await;
    assert_eq!(availability_rx.recv().await.unwrap(), BrokerEvent::Available);

    // The real watchdog fires `handle_tcp_connection_failure` after
    // `3 * max(10_000, 5_000) = 30_000`ms of read inactivity (exercised
    // directly against `HeartBeat::effective_read_timeout_ms` below); here
    // we drive the same failure path `handle_failure` takes once the
    // underlying TCP connection reports a read error.
    handler.handle_failure(TransportError::Closed).await;
    assert_eq!(availability_rx.recv().await.unwrap(), BrokerEvent::Unavailable);
}

#[test]
fn s4_heartbeat_arithmetic_matches_the_scenario() {
    assert_eq!(HeartBeat::effective_read_timeout_ms(10_000, 5_000), Some(30_000));
}

#[tokio::test]
async fn s5_server_send_while_broker_unavailable_fails_synchronously() {
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, _outbound_rx) = RelayController::new(RelayConfig::default(), tcp_client).unwrap();

    let result = controller.dispatch(send_message(None, "/topic/x", b"hi")).await;
    assert!(matches!(result, Err(RelayError::BrokerUnavailable)));
}

#[tokio::test]
async fn s6_disconnect_clears_the_registry() {
    let tcp_client = Arc::new(RecordingTcpClient::default());
    let (controller, _outbound_rx) = RelayController::new(RelayConfig::default(), tcp_client.clone()).unwrap();

    controller.dispatch(connect_message("B")).await.unwrap();
    let_spawned_tasks_run().await;

    let handler = tcp_client.last_handler();
    let conn = Arc::new(CapturingConnection::default());
    handler.after_connected(conn.clone()).await;
    handler.handle_message(connected_message(HeartBeat::disabled())).await;
    assert!(controller.is_session_registered("B"));

    controller.dispatch(disconnect_message("B")).await.unwrap();
    assert!(!controller.is_session_registered("B"));

    let result = controller.dispatch(send_message(Some("B"), "/topic/x", b"hi")).await;
    assert!(matches!(result, Err(RelayError::UnroutableMessage(_))));
}

mod invariants {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Invariant 6: the effective heartbeat intervals always follow
        /// `max(cx, sy)` / `3 * max(cy, sx)`, or disable when either side is 0.
        #[test]
        fn heartbeat_intervals_follow_the_negotiation_rule(a in 0u64..60_000, b in 0u64..60_000) {
            let write = HeartBeat::effective_write_interval_ms(a, b);
            if a > 0 && b > 0 {
                prop_assert_eq!(write, Some(a.max(b)));
            } else {
                prop_assert_eq!(write, None);
            }

            let read = HeartBeat::effective_read_timeout_ms(a, b);
            if a > 0 && b > 0 {
                prop_assert_eq!(read, Some(a.max(b) * 3));
            } else {
                prop_assert_eq!(read, None);
            }
        }

        /// Invariant 7: a destination only reaches a session when it starts
        /// with some configured prefix (or the prefix set is empty).
        #[test]
        fn prefix_filter_only_admits_matching_destinations(
            prefix in "/[a-z]{1,6}/",
            suffix in "[a-z]{0,6}",
            other_prefix in "/[a-z]{1,6}/",
        ) {
            let mut config = RelayConfig::default();
            config.destination_prefixes = vec![prefix.clone()];

            let matching = format!("{prefix}{suffix}");
            prop_assert!(config.allows_destination(&matching));

            if other_prefix != prefix {
                let non_matching = format!("{other_prefix}{suffix}");
                prop_assert_eq!(config.allows_destination(&non_matching), non_matching.starts_with(&prefix));
            }
        }
    }
}
