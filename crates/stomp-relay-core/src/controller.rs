//! The relay controller: owns startup/shutdown of the system session, and
//! dispatches inbound application messages to the right session handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stomp_relay_protocol::{HeaderAccessor, HeartBeat, Message, StompCommand, ACCEPT_VERSION, SYSTEM_SESSION_ID};
use stomp_relay_transport::{ReconnectStrategy, SessionEvents, TcpClient};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::{HeaderInitializer, RelayConfig};
use crate::error::{RelayError, RelayResult};
use crate::events::{BrokerAvailabilityPublisher, BrokerEvent};
use crate::registry::SessionRegistry;
use crate::session::{SessionHandler, SessionRole};

const OUTBOUND_CHANNEL_CAPACITY: usize = 1024;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(5000);

/// State shared between the controller and every `SessionHandler` it owns.
/// Session handlers hold only a `Weak` reference to this so the controller
/// can be dropped without a reference cycle keeping it alive.
pub struct RelayShared {
    pub(crate) config: RelayConfig,
    pub(crate) tcp_client: Arc<dyn TcpClient>,
    pub(crate) registry: SessionRegistry,
    pub(crate) outbound_tx: mpsc::Sender<Message>,
    pub(crate) availability: BrokerAvailabilityPublisher,
    pub(crate) header_initializer: Option<Arc<dyn HeaderInitializer>>,
    running: AtomicBool,
}

impl RelayShared {
    fn broker_available(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.registry.get(SYSTEM_SESSION_ID).is_some_and(|h| h.is_stomp_connected())
    }
}

/// Multiplexes many logical client sessions and one system session over
/// independent TCP connections to an upstream broker.
pub struct RelayController {
    shared: Arc<RelayShared>,
}

impl RelayController {
    /// Builds a controller. Returns the receiving end of the outbound
    /// channel the caller should drain and forward to its own clients
    /// (or to whichever downstream carries server-originated traffic).
    pub fn new(config: RelayConfig, tcp_client: Arc<dyn TcpClient>) -> RelayResult<(Arc<Self>, mpsc::Receiver<Message>)> {
        Self::with_header_initializer(config, tcp_client, None)
    }

    /// Like [`Self::new`], additionally wiring a [`HeaderInitializer`]
    /// applied to every frame before it reaches the outbound channel.
    pub fn with_header_initializer(
        config: RelayConfig,
        tcp_client: Arc<dyn TcpClient>,
        header_initializer: Option<Arc<dyn HeaderInitializer>>,
    ) -> RelayResult<(Arc<Self>, mpsc::Receiver<Message>)> {
        config.validate().map_err(RelayError::ConfigurationInvalid)?;

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let shared = Arc::new(RelayShared {
            config,
            tcp_client,
            registry: SessionRegistry::new(),
            outbound_tx,
            availability: BrokerAvailabilityPublisher::new(),
            header_initializer,
            running: AtomicBool::new(false),
        });

        Ok((Arc::new(Self { shared }), outbound_rx))
    }

    #[must_use]
    pub fn availability(&self) -> &BrokerAvailabilityPublisher {
        &self.shared.availability
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.shared.registry.len()
    }

    #[must_use]
    pub fn is_session_registered(&self, session_id: &str) -> bool {
        self.shared.registry.contains(session_id)
    }

    /// Builds the system session's CONNECT header snapshot, registers it,
    /// and starts its auto-reconnecting TCP connection.
    pub async fn start(&self) {
        self.shared.running.store(true, Ordering::Release);

        let mut headers = HeaderAccessor::new();
        let _ = headers.set_command(StompCommand::Connect);
        let _ = headers.set("accept-version", ACCEPT_VERSION);
        let _ = headers.set("login", self.shared.config.system_login.clone());
        let _ = headers.set("passcode", self.shared.config.system_passcode.clone());
        let _ = headers.set_heart_beat(HeartBeat::new(
            self.shared.config.system_heartbeat_send_interval_ms,
            self.shared.config.system_heartbeat_receive_interval_ms,
        ));
        if let Some(vhost) = &self.shared.config.virtual_host {
            let _ = headers.set("host", vhost.clone());
        }

        let system = SessionHandler::new(SYSTEM_SESSION_ID, SessionRole::System, headers, Arc::downgrade(&self.shared));
        self.shared.registry.insert(SYSTEM_SESSION_ID, system.clone());

        let tcp_client = self.shared.tcp_client.clone();
        let handler: Arc<dyn SessionEvents> = system;
        tokio::spawn(async move {
            if let Err(e) = tcp_client.connect_with_reconnect(handler, ReconnectStrategy::system_session_default()).await {
                error!("system session connect loop exited: {e}");
            }
        });
    }

    /// Publishes broker-unavailable, stops accepting new dispatches, and
    /// waits up to a fixed grace period for the TCP client to close every
    /// connection. Failures are logged, never propagated: shutdown always
    /// completes.
    pub async fn shutdown(&self) {
        self.shared.availability.publish(BrokerEvent::Unavailable);
        self.shared.running.store(false, Ordering::Release);

        match tokio::time::timeout(SHUTDOWN_GRACE, self.shared.tcp_client.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("TCP client shutdown reported an error: {e}"),
            Err(_) => warn!("TCP client shutdown did not complete within {SHUTDOWN_GRACE:?}"),
        }
    }

    /// Spawns a background task draining `inbound` and `broker_directed`,
    /// dispatching each message on its own task so a stalled session (a full
    /// per-connection outbound queue, an unresponsive peer) cannot back up
    /// dispatch for every other session. Delivery failures are logged, not
    /// propagated. Dispatch order across sessions is not preserved; use
    /// [`Self::dispatch`] directly instead when the caller needs to observe
    /// delivery failure synchronously or needs strict ordering for a single
    /// session.
    pub fn spawn_dispatch_loop(self: &Arc<Self>, mut inbound: mpsc::Receiver<Message>, mut broker_directed: mpsc::Receiver<Message>) {
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = inbound.recv() => {
                        let Some(msg) = msg else { break };
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            if let Err(e) = controller.dispatch(msg).await {
                                debug!("dispatch error on inbound channel: {e}");
                            }
                        });
                    }
                    msg = broker_directed.recv() => {
                        let Some(msg) = msg else { break };
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            if let Err(e) = controller.dispatch(msg).await {
                                warn!("dispatch error on broker-directed channel: {e}");
                            }
                        });
                    }
                }
            }
        });
    }

    /// Routes one inbound application message to its session handler.
    ///
    /// 1. Reads `session` off the raw headers.
    /// 2. If the broker isn't available: a message explicitly addressed to
    ///    the system session (or carrying no session id at all) fails
    ///    synchronously; anything else is dropped silently.
    /// 3. Adapts the header accessor to STOMP-typed, surfacing
    ///    `MalformedAccessor`/derivation failures.
    /// 4. An absent session id is only valid on a SEND (server-originated,
    ///    broker-directed traffic); it's assigned to the system session.
    /// 5. Commands carrying a destination are dropped if it doesn't match a
    ///    configured prefix.
    /// 6. CONNECT spins up a new client session; everything else forwards
    ///    to the already-registered handler.
    pub async fn dispatch(&self, message: Message) -> RelayResult<()> {
        let raw_session_id = message.headers.session_id().map(str::to_string);

        if !self.shared.broker_available() {
            return match raw_session_id.as_deref() {
                None | Some(SYSTEM_SESSION_ID) => Err(RelayError::BrokerUnavailable),
                _ => {
                    debug!(session_id = ?raw_session_id, "dropping message: broker unavailable");
                    Ok(())
                }
            };
        }

        if !message.headers.has_accessor() {
            warn!("dropping message with no header accessor");
            return Err(RelayError::MalformedAccessor("message has no header accessor".into()));
        }

        let mut message = message;
        message.headers.ensure_stomp_typed()?;

        let session_id = match raw_session_id {
            Some(id) => id,
            None => {
                if message.command() != Some(StompCommand::Send) {
                    warn!("dropping message with no session id and a non-SEND command");
                    return Err(RelayError::UnroutableMessage("absent session id on non-SEND message".into()));
                }
                let _ = message.headers.set_session_id(SYSTEM_SESSION_ID);
                SYSTEM_SESSION_ID.to_string()
            }
        };

        if let Some(command) = message.command() {
            if command.requires_destination() {
                let destination = message.headers.destination().unwrap_or_default();
                if !self.shared.config.allows_destination(destination) {
                    debug!(%destination, "dropping message: no configured prefix match");
                    return Ok(());
                }
            }
        }

        match message.command() {
            Some(StompCommand::Connect) => self.start_client_session(session_id, message).await,
            Some(StompCommand::Disconnect) => match self.shared.registry.get(&session_id) {
                Some(handler) => handler.forward(message).await,
                None => Ok(()),
            },
            _ => match self.shared.registry.get(&session_id) {
                Some(handler) => handler.forward(message).await,
                None => {
                    warn!(%session_id, "dropping message: no session handler registered");
                    Err(RelayError::UnroutableMessage(format!("no session handler for {session_id}")))
                }
            },
        }
    }

    async fn start_client_session(&self, session_id: String, mut message: Message) -> RelayResult<()> {
        let _ = message.headers.set("login", self.shared.config.client_login.clone());
        let _ = message.headers.set("passcode", self.shared.config.client_passcode.clone());
        if let Some(vhost) = &self.shared.config.virtual_host {
            let _ = message.headers.set("host", vhost.clone());
        }

        let handler = SessionHandler::new(session_id.clone(), SessionRole::Client, message.headers, Arc::downgrade(&self.shared));
        self.shared.registry.insert(session_id, handler.clone());

        let tcp_client = self.shared.tcp_client.clone();
        let event_handler: Arc<dyn SessionEvents> = handler;
        tokio::spawn(async move {
            let _ = tcp_client.connect(event_handler).await;
        });
        Ok(())
    }
}
