//! The TCP client adapter boundary and its default tokio-based implementation.

pub mod codec;
pub mod error;
pub mod reconnect;
pub mod tcp;
pub mod traits;

pub use codec::StompFrameCodec;
pub use error::{TransportError, TransportResult};
pub use reconnect::ReconnectStrategy;
pub use tcp::{TokioTcpClient, TokioTcpConnection};
pub use traits::{InactivityWatchdog, SessionEvents, TcpClient, TcpConnection};
