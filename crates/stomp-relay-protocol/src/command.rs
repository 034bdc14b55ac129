//! STOMP command vocabulary shared by client-to-broker and broker-to-client frames.

use std::fmt;

use crate::error::ProtocolError;

/// A STOMP command, as found in the first line of a frame.
///
/// Client-to-broker and broker-to-client commands share one enum here because
/// a single `SessionHandler` forwards frames in both directions over the same
/// connection; the direction is implied by who observes the frame, not by the
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StompCommand {
    Connect,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    /// Returns the wire representation of this command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parses a command from its wire representation (case-insensitive, per
    /// the STOMP 1.2 grammar).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match_ignore_ascii_case(s)?)
    }

    /// Whether this command carries a `destination` header that the relay
    /// controller's prefix filter applies to.
    #[must_use]
    pub const fn requires_destination(self) -> bool {
        matches!(self, Self::Send | Self::Subscribe | Self::Message)
    }

    /// Derives the client-side STOMP command implied by a generic
    /// simple-messaging type, used when adapting a non-STOMP-typed accessor.
    #[must_use]
    pub const fn from_simple_message_type(ty: SimpleMessageType) -> Option<Self> {
        match ty {
            SimpleMessageType::Connect => Some(Self::Connect),
            SimpleMessageType::Message => Some(Self::Send),
            SimpleMessageType::Subscribe => Some(Self::Subscribe),
            SimpleMessageType::Unsubscribe => Some(Self::Unsubscribe),
            SimpleMessageType::Disconnect => Some(Self::Disconnect),
            SimpleMessageType::ConnectAck
            | SimpleMessageType::DisconnectAck
            | SimpleMessageType::Heartbeat
            | SimpleMessageType::Other => None,
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn match_ignore_ascii_case(s: &str) -> Option<StompCommand> {
    use StompCommand::*;
    for cmd in [
        Connect, Connected, Send, Subscribe, Unsubscribe, Ack, Nack, Begin, Commit, Abort,
        Disconnect, Message, Receipt, Error,
    ] {
        if s.eq_ignore_ascii_case(cmd.as_str()) {
            return Some(cmd);
        }
    }
    None
}

/// The generic "simple messaging" message type carried by a non-STOMP-typed
/// accessor, distinguishing STOMP-typed frames from generic simple-messaging
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleMessageType {
    Connect,
    ConnectAck,
    Message,
    Subscribe,
    Unsubscribe,
    Disconnect,
    DisconnectAck,
    Heartbeat,
    Other,
}

/// Adapts a simple message type into a STOMP command, surfacing the same
/// `MalformedAccessor` failure the controller uses when no command can be
/// derived (e.g. a generic accessor carrying `Other`).
pub fn derive_stomp_command(ty: SimpleMessageType) -> Result<StompCommand, ProtocolError> {
    StompCommand::from_simple_message_type(ty).ok_or(ProtocolError::UndeterminedCommand)
}
