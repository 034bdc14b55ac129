//! STOMP frame, header accessor, and message types consumed by the relay core.
//!
//! Byte-level STOMP framing lives in the transport crate's codec; this crate
//! only defines the in-memory shapes the relay's session and controller
//! logic operate on.

pub mod command;
pub mod error;
pub mod headers;
pub mod heartbeat;
pub mod message;

pub use command::{derive_stomp_command, SimpleMessageType, StompCommand};
pub use error::ProtocolError;
pub use headers::{AccessorKind, HeaderAccessor};
pub use heartbeat::{HeartBeat, HEARTBEAT_PAYLOAD};
pub use message::Message;

/// The reserved session id for the relay's own, server-originated connection.
pub const SYSTEM_SESSION_ID: &str = "stompRelaySystemSessionId";

/// STOMP protocol versions the relay advertises on system CONNECT frames.
pub const ACCEPT_VERSION: &str = "1.1,1.2";
