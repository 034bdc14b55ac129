//! Protocol-level errors surfaced while adapting header accessors.

use thiserror::Error;

/// Errors that originate while inspecting or adapting a message's headers,
/// distinct from the relay-wide `RelayError` in `stomp-relay-core` (which
/// wraps these as `MalformedAccessor`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The message carried no header accessor at all.
    #[error("message has no header accessor")]
    NoAccessor,

    /// A generic simple-messaging accessor had no STOMP command set and none
    /// could be derived from its message type.
    #[error("could not determine a STOMP command for this message")]
    UndeterminedCommand,

    /// A header was read that requires sealing rules the accessor violated
    /// (e.g. a write attempted after `seal()`).
    #[error("header accessor is sealed and cannot be mutated")]
    Sealed,
}
