//! Relay-wide error types.

use thiserror::Error;

/// A specialized `Result` for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Errors the relay controller and session handlers surface.
///
/// `TcpConnectFailure` / `TcpSendFailure` / `TcpClosed` / `HeartbeatTimeout`
/// all converge on the same connection-failure handling path; they are kept
/// distinct here only so logs and tests can tell them apart.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum RelayError {
    /// Missing or empty mandatory configuration at startup.
    #[error("invalid relay configuration: {0}")]
    ConfigurationInvalid(String),

    /// The relay isn't accepting dispatch (not running, or the system
    /// session isn't STOMP-connected yet); surfaced synchronously to
    /// system-bound dispatch.
    #[error("Message broker is not active.")]
    BrokerUnavailable,

    /// The system session's `forward` was called while it isn't
    /// STOMP-connected; distinct text from `BrokerUnavailable` per the
    /// dispatch-time vs. forward-time checks.
    #[error("Cannot forward messages on system connection")]
    SystemSessionNotConnected,

    /// The TCP connect attempt for a session failed.
    #[error("TCP connect failed: {0}")]
    TcpConnectFailure(String),

    /// A write to an established session connection failed.
    #[error("TCP send failed: {0}")]
    TcpSendFailure(String),

    /// The broker closed the session's TCP connection.
    #[error("TCP connection closed: {0}")]
    TcpClosed(String),

    /// No frame was received from the broker within the negotiated
    /// read-inactivity limit.
    #[error("heartbeat timeout: {0}")]
    HeartbeatTimeout(String),

    /// No session handler matched, no destination prefix matched, or the
    /// session id was absent on a non-SEND message.
    #[error("unroutable message: {0}")]
    UnroutableMessage(String),

    /// An inbound application message carried no header accessor.
    #[error("malformed accessor: {0}")]
    MalformedAccessor(String),
}

impl From<stomp_relay_protocol::ProtocolError> for RelayError {
    fn from(err: stomp_relay_protocol::ProtocolError) -> Self {
        Self::MalformedAccessor(err.to_string())
    }
}

impl From<stomp_relay_transport::TransportError> for RelayError {
    fn from(err: stomp_relay_transport::TransportError) -> Self {
        match err {
            stomp_relay_transport::TransportError::ConnectFailed(reason) => {
                Self::TcpConnectFailure(reason)
            }
            stomp_relay_transport::TransportError::SendFailed(reason) => {
                Self::TcpSendFailure(reason)
            }
            stomp_relay_transport::TransportError::Closed => {
                Self::TcpClosed("connection closed".into())
            }
            stomp_relay_transport::TransportError::ConfigurationError(reason) => {
                Self::ConfigurationInvalid(reason)
            }
        }
    }
}
