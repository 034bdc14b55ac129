//! Transport-layer errors, following the shape of
//! `turbomcp_transport_traits::TransportError`: one named variant per failure
//! category instead of an opaque string.

use thiserror::Error;

/// A specialized `Result` for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors surfaced by a `TcpClient` / `TcpConnection` implementation.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// The initial TCP connect failed.
    #[error("TCP connect failed: {0}")]
    ConnectFailed(String),

    /// A write to an established connection failed.
    #[error("TCP send failed: {0}")]
    SendFailed(String),

    /// The remote peer closed the connection.
    #[error("TCP connection closed")]
    Closed,

    /// The connection was not configured correctly (e.g. no remote address).
    #[error("transport configuration error: {0}")]
    ConfigurationError(String),
}
