//! Reconnect strategies accepted by `TcpClient::connect_with_reconnect`.

use std::time::Duration;

/// How a `TcpClient` should re-invoke `connect` after a disconnect or
/// failure. The relay only ever uses `FixedInterval` (the system session
/// reconnects every 5000 ms), but the enum is kept open for other strategies
/// the way `turbomcp_transport_traits` keeps its transport traits generic
/// over configuration.
#[derive(Debug, Clone, Copy)]
pub enum ReconnectStrategy {
    /// Retry after a fixed delay, indefinitely.
    FixedInterval(Duration),
    /// Never retry; the `TcpClient` invokes `connect` exactly once.
    None,
}

impl ReconnectStrategy {
    /// The relay's system-session reconnect policy: a fixed 5000 ms interval.
    #[must_use]
    pub const fn system_session_default() -> Self {
        Self::FixedInterval(Duration::from_millis(5000))
    }

    #[must_use]
    pub const fn delay(self) -> Option<Duration> {
        match self {
            Self::FixedInterval(d) => Some(d),
            Self::None => None,
        }
    }
}
