//! The session handler: one instance per live logical session (a remote
//! client session or the singleton system session). Owns a TCP connection,
//! tracks STOMP-level connectedness, forwards application frames to the
//! broker, ingests broker frames, runs heartbeat watchdogs, and tears down
//! on failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bytes::Bytes;
use stomp_relay_protocol::{HeaderAccessor, HeartBeat, Message, StompCommand};
use stomp_relay_transport::{InactivityWatchdog, SessionEvents, TcpConnection, TransportError};
use tracing::{trace, warn};

use crate::controller::RelayShared;
use crate::error::{RelayError, RelayResult};
use crate::events::BrokerEvent;

/// Which specialization a session handler plays. The system session adds
/// auto-reconnect, broker-availability publication, and synchronous
/// forwarding on top of the otherwise-identical client behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Client,
    System,
}

/// The session's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    TcpConnecting,
    TcpConnected,
    StompConnected,
    Closed,
}

pub struct SessionHandler {
    session_id: String,
    role: SessionRole,
    connect_headers: HeaderAccessor,
    tcp_connection: ArcSwapOption<dyn TcpConnection>,
    stomp_connected: AtomicBool,
    state: StdMutex<SessionState>,
    shared: Weak<RelayShared>,
    self_weak: Weak<SessionHandler>,
}

impl SessionHandler {
    /// Builds a handler wired back to the controller's shared state. The
    /// returned `Arc` is self-referential (`self_weak`) so inactivity
    /// watchdogs can be handed a callback that outlives the call that
    /// registered it without the handler owning itself.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        role: SessionRole,
        connect_headers: HeaderAccessor,
        shared: Weak<RelayShared>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            session_id: session_id.into(),
            role,
            connect_headers,
            tcp_connection: ArcSwapOption::empty(),
            stomp_connected: AtomicBool::new(false),
            state: StdMutex::new(SessionState::Init),
            shared,
            self_weak: weak_self.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(session_id: impl Into<String>, role: SessionRole, connect_headers: HeaderAccessor) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            connect_headers,
            tcp_connection: ArcSwapOption::empty(),
            stomp_connected: AtomicBool::new(false),
            state: StdMutex::new(SessionState::Init),
            shared: Weak::new(),
            self_weak: Weak::new(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn role(&self) -> SessionRole {
        self.role
    }

    #[must_use]
    pub fn is_stomp_connected(&self) -> bool {
        self.stomp_connected.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state mutex poisoned")
    }

    /// Forwards an application-originated message to the broker.
    ///
    /// Not STOMP-connected + client session: silently drops (no-op).
    /// Not STOMP-connected + system session: fails synchronously so a
    /// server-originated publisher can observe the broker being down.
    pub async fn forward(&self, message: Message) -> RelayResult<()> {
        if !self.is_stomp_connected() {
            return match self.role {
                SessionRole::System => Err(RelayError::SystemSessionNotConnected),
                SessionRole::Client => Ok(()),
            };
        }

        let is_disconnect = message.command() == Some(StompCommand::Disconnect);
        let Some(conn) = self.tcp_connection.load_full() else {
            return Ok(());
        };

        match conn.send(message).await {
            Ok(()) => {
                if is_disconnect {
                    self.clear_connection().await;
                }
                Ok(())
            }
            Err(e) => {
                if self.tcp_connection.load().is_some() {
                    self.handle_tcp_connection_failure(format!("send failed: {e}")).await;
                }
                match self.role {
                    SessionRole::System => Err(e.into()),
                    SessionRole::Client => Ok(()),
                }
            }
        }
    }

    async fn on_broker_frame(&self, mut frame: Message) {
        let _ = frame.headers.set_session_id(self.session_id.clone());

        if frame.is_heartbeat() {
            trace!(session_id = %self.session_id, "heartbeat received from broker");
        } else if frame.command() == Some(StompCommand::Connected) {
            self.stomp_connected.store(true, Ordering::Release);
            *self.state.lock().expect("session state mutex poisoned") = SessionState::StompConnected;
            self.negotiate_and_arm_heartbeats(&frame);
            if self.role == SessionRole::System {
                if let Some(shared) = self.shared.upgrade() {
                    shared.availability.publish(BrokerEvent::Available);
                }
            }
        }

        let Some(shared) = self.shared.upgrade() else { return };
        if let Some(initializer) = &shared.header_initializer {
            initializer.initialize(&mut frame.headers);
        }
        frame.seal();
        let _ = shared.outbound_tx.send(frame).await;
    }

    /// Resolves the effective heartbeat intervals from this side's CONNECT
    /// headers and the broker's CONNECTED headers, and arms the
    /// corresponding watchdogs. Only the system session heartbeats; client
    /// sessions forward heartbeats end-to-end without relay involvement.
    fn negotiate_and_arm_heartbeats(&self, connected_frame: &Message) {
        if self.role != SessionRole::System {
            return;
        }
        let Some(conn) = self.tcp_connection.load_full() else {
            return;
        };

        let ours = self.connect_headers.heart_beat().unwrap_or_default();
        let theirs = connected_frame.headers.heart_beat().unwrap_or_default();

        if let Some(write_ms) = HeartBeat::effective_write_interval_ms(ours.send_ms, theirs.receive_ms) {
            let watchdog: Arc<dyn InactivityWatchdog> =
                Arc::new(WriteInactivityWatchdog { session: self.self_weak.clone() });
            conn.on_write_inactivity(watchdog, Duration::from_millis(write_ms));
        }
        if let Some(read_ms) = HeartBeat::effective_read_timeout_ms(ours.receive_ms, theirs.send_ms) {
            let watchdog: Arc<dyn InactivityWatchdog> =
                Arc::new(ReadInactivityWatchdog { session: self.self_weak.clone(), limit_ms: read_ms });
            conn.on_read_inactivity(watchdog, Duration::from_millis(read_ms));
        }
    }

    async fn send_heartbeat_frame(&self) {
        let Some(conn) = self.tcp_connection.load_full() else {
            return;
        };
        if let Err(e) = conn.send(Message::heartbeat_frame()).await {
            self.handle_tcp_connection_failure(format!("heartbeat send failed: {e}")).await;
        }
    }

    /// Idempotent failure handler: logs, emits a STOMP ERROR to the outbound
    /// channel for client sessions, tears the connection down, and for the
    /// system session publishes broker-unavailable.
    async fn handle_tcp_connection_failure(&self, reason: String) {
        warn!(session_id = %self.session_id, %reason, "tearing down session after TCP failure");

        if self.role == SessionRole::Client {
            let error_frame = Message::error_frame(&self.session_id, reason);
            if let Some(shared) = self.shared.upgrade() {
                let _ = shared.outbound_tx.send(error_frame).await;
            }
        }

        self.clear_connection().await;

        if self.role == SessionRole::System {
            if let Some(shared) = self.shared.upgrade() {
                shared.availability.publish(BrokerEvent::Unavailable);
            }
        }
    }

    /// Deregisters from the registry (client sessions only), clears
    /// STOMP-connected state, and closes the TCP connection. The system
    /// session id is never removed: its external reconnect strategy expects
    /// to find it still registered when it re-dials.
    async fn clear_connection(&self) {
        self.stomp_connected.store(false, Ordering::Release);
        *self.state.lock().expect("session state mutex poisoned") = SessionState::Closed;
        if let Some(conn) = self.tcp_connection.swap(None) {
            conn.close().await;
        }
        if self.role == SessionRole::Client {
            if let Some(shared) = self.shared.upgrade() {
                shared.registry.remove(&self.session_id);
            }
        }
    }
}

struct WriteInactivityWatchdog {
    session: Weak<SessionHandler>,
}

#[async_trait]
impl InactivityWatchdog for WriteInactivityWatchdog {
    async fn fire(&self) {
        if let Some(session) = self.session.upgrade() {
            session.send_heartbeat_frame().await;
        }
    }
}

struct ReadInactivityWatchdog {
    session: Weak<SessionHandler>,
    limit_ms: u64,
}

#[async_trait]
impl InactivityWatchdog for ReadInactivityWatchdog {
    async fn fire(&self) {
        if let Some(session) = self.session.upgrade() {
            session
                .handle_tcp_connection_failure(format!(
                    "No heartbeat from broker for more than {}ms, closing connection",
                    self.limit_ms
                ))
                .await;
        }
    }
}

#[async_trait]
impl SessionEvents for SessionHandler {
    async fn after_connected(&self, connection: Arc<dyn TcpConnection>) {
        *self.state.lock().expect("session state mutex poisoned") = SessionState::TcpConnected;
        self.tcp_connection.store(Some(connection.clone()));

        let connect_frame = Message::new(Bytes::new(), self.connect_headers.clone());
        if let Err(e) = connection.send(connect_frame).await {
            self.handle_tcp_connection_failure(format!("failed to send CONNECT: {e}")).await;
        }
    }

    async fn after_connect_failure(&self, error: TransportError) {
        self.handle_tcp_connection_failure(format!("TCP connect failed: {error}")).await;
    }

    async fn handle_message(&self, frame: Message) {
        self.on_broker_frame(frame).await;
    }

    async fn handle_failure(&self, error: TransportError) {
        if self.tcp_connection.load().is_some() {
            self.handle_tcp_connection_failure(format!("TCP failure: {error}")).await;
        }
    }

    async fn after_connection_closed(&self) {
        if self.tcp_connection.load().is_some() {
            self.handle_tcp_connection_failure("TCP connection closed by peer".into()).await;
        }
    }
}
