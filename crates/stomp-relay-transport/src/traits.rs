//! The TCP client adapter interface the relay core consumes.
//!
//! These traits are the external collaborator boundary: the relay core is
//! generic over any implementation, and tests drive it against an in-memory
//! fake rather than a real socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stomp_relay_protocol::Message;

use crate::error::{TransportError, TransportResult};
use crate::reconnect::ReconnectStrategy;

/// Callback surface a `TcpClient` invokes on a session's behalf: connect
/// success/failure, inbound frames, asynchronous failures, and clean close.
#[async_trait]
pub trait SessionEvents: Send + Sync {
    /// A TCP connection was established; `connection` is now owned by the
    /// session for sending.
    async fn after_connected(&self, connection: Arc<dyn TcpConnection>);

    /// The TCP connect attempt failed.
    async fn after_connect_failure(&self, error: TransportError);

    /// A frame was decoded from the broker.
    async fn handle_message(&self, frame: Message);

    /// An established connection failed asynchronously (read error, etc).
    async fn handle_failure(&self, error: TransportError);

    /// The remote peer closed the connection cleanly.
    async fn after_connection_closed(&self);
}

/// A live TCP connection to the broker.
#[async_trait]
pub trait TcpConnection: Send + Sync {
    /// Writes a frame to the connection, resolving once the write succeeds.
    async fn send(&self, message: Message) -> TransportResult<()>;

    /// Closes the connection. Idempotent.
    async fn close(&self);

    /// Registers a watchdog fired when no frame has been sent for
    /// `interval`. Only one write watchdog may be registered per connection.
    fn on_write_inactivity(&self, watchdog: Arc<dyn InactivityWatchdog>, interval: Duration);

    /// Registers a watchdog fired when no frame has been received for
    /// `interval`. Only one read watchdog may be registered per connection.
    fn on_read_inactivity(&self, watchdog: Arc<dyn InactivityWatchdog>, interval: Duration);
}

/// A timer callback invoked by a connection's inactivity watchdog.
#[async_trait]
pub trait InactivityWatchdog: Send + Sync {
    async fn fire(&self);
}

/// The TCP client: initiates connections and owns process-wide shutdown.
#[async_trait]
pub trait TcpClient: Send + Sync {
    /// Initiates a one-shot TCP connection. `handler` receives the
    /// connection lifecycle callbacks.
    async fn connect(&self, handler: Arc<dyn SessionEvents>) -> TransportResult<()>;

    /// As `connect`, but on any disconnect or failure, `connect` is
    /// re-invoked after `strategy`'s interval.
    async fn connect_with_reconnect(
        &self,
        handler: Arc<dyn SessionEvents>,
        strategy: ReconnectStrategy,
    ) -> TransportResult<()>;

    /// Shuts down the client, closing all connections. Resolves once every
    /// connection has closed, or after the caller's own bounded wait.
    async fn shutdown(&self) -> TransportResult<()>;
}
