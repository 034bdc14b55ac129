//! The `Message` the relay controller and session handler pass around:
//! payload plus headers.

use bytes::Bytes;

use crate::command::StompCommand;
use crate::headers::HeaderAccessor;
use crate::heartbeat::HEARTBEAT_PAYLOAD;

/// An application message: a byte payload (possibly empty) plus its header
/// accessor. Byte-level STOMP framing lives below this boundary; this is the
/// in-memory shape the core operates on, the same split
/// `turbomcp_transport_traits::TransportMessage` draws between payload and
/// metadata for its transports.
#[derive(Debug, Clone)]
pub struct Message {
    pub payload: Bytes,
    pub headers: HeaderAccessor,
}

impl Message {
    #[must_use]
    pub fn new(payload: impl Into<Bytes>, headers: HeaderAccessor) -> Self {
        Self { payload: payload.into(), headers }
    }

    #[must_use]
    pub fn empty(headers: HeaderAccessor) -> Self {
        Self { payload: Bytes::new(), headers }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.headers.session_id()
    }

    #[must_use]
    pub fn command(&self) -> Option<StompCommand> {
        self.headers.command()
    }

    /// Whether this is the distinguished STOMP heartbeat frame: a payload
    /// matching the single-newline heartbeat marker.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.payload.as_ref() == HEARTBEAT_PAYLOAD
    }

    /// Builds the heartbeat frame. Cheap to construct repeatedly since the
    /// payload is a static byte slice; callers may still cache the result and
    /// clone the `Bytes` handle on each send.
    #[must_use]
    pub fn heartbeat_frame() -> Self {
        let mut headers = HeaderAccessor::new();
        let _ = headers.set("heartbeat", "true");
        Self::new(Bytes::from_static(HEARTBEAT_PAYLOAD), headers)
    }

    /// Builds a STOMP ERROR frame for a session: carries `session` and
    /// `message` headers, with an empty payload.
    #[must_use]
    pub fn error_frame(session_id: &str, reason: impl Into<String>) -> Self {
        let mut headers = HeaderAccessor::new();
        let _ = headers.set_command(StompCommand::Error);
        let _ = headers.set_session_id(session_id);
        let _ = headers.set("message", reason.into());
        Self::empty(headers)
    }

    /// Seals the header accessor, preventing further mutation. Messages
    /// handed to an outbound channel must be sealed first.
    pub fn seal(&mut self) {
        self.headers.seal();
    }
}
