//! The header accessor: a mutable view over a message's headers, with the
//! STOMP-typed / generic simple-messaging distinction, and the sealing
//! contract (messages passed to an outbound channel must have their
//! accessors sealed first).

use std::collections::BTreeMap;

use crate::command::{SimpleMessageType, StompCommand};
use crate::error::ProtocolError;
use crate::heartbeat::HeartBeat;

const SESSION_ID: &str = "session";
const DESTINATION: &str = "destination";
const LOGIN: &str = "login";
const PASSCODE: &str = "passcode";
const HOST: &str = "host";
const HEART_BEAT: &str = "heart-beat";
const ACCEPT_VERSION: &str = "accept-version";
const MESSAGE_HEADER: &str = "message";

/// Which flavor of accessor produced this header set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// The accessor is already STOMP-typed: `command()` reads directly.
    Stomp,
    /// A generic simple-messaging accessor; the controller must adapt it
    /// into a STOMP-typed one before dispatch.
    Simple(SimpleMessageType),
}

/// A mutable view over a message's headers.
///
/// Sealing (`seal`) makes further mutation an error, modeling the freeze step
/// required before a message reaches an outbound application channel.
#[derive(Debug, Clone, Default)]
pub struct HeaderAccessor {
    kind: Option<AccessorKind>,
    command: Option<StompCommand>,
    values: BTreeMap<String, String>,
    sealed: bool,
}

impl HeaderAccessor {
    /// Creates an accessor with no command and no headers, defaulting to
    /// STOMP-typed (the common case: a relay-originated frame).
    #[must_use]
    pub fn new() -> Self {
        Self { kind: Some(AccessorKind::Stomp), ..Default::default() }
    }

    /// Creates an accessor carrying no kind at all, modeling a message that
    /// arrived with no header accessor (surfaced upstream as
    /// `MalformedAccessor`).
    #[must_use]
    pub fn without_accessor() -> Self {
        Self { kind: None, ..Default::default() }
    }

    /// Creates a generic simple-messaging accessor of the given message type.
    #[must_use]
    pub fn simple(ty: SimpleMessageType) -> Self {
        Self { kind: Some(AccessorKind::Simple(ty)), ..Default::default() }
    }

    /// Whether this accessor is present at all.
    #[must_use]
    pub const fn has_accessor(&self) -> bool {
        self.kind.is_some()
    }

    #[must_use]
    pub const fn kind(&self) -> Option<AccessorKind> {
        self.kind
    }

    /// Adapts a generic simple-messaging accessor into a STOMP-typed one,
    /// deriving the command from the message type if none is set.
    /// No-op if already STOMP-typed. Fails with `UndeterminedCommand` if no
    /// command is present and none can be derived, or `NoAccessor` if there
    /// was no accessor to begin with.
    pub fn ensure_stomp_typed(&mut self) -> Result<(), ProtocolError> {
        match self.kind {
            None => Err(ProtocolError::NoAccessor),
            Some(AccessorKind::Stomp) => Ok(()),
            Some(AccessorKind::Simple(ty)) => {
                if self.command.is_none() {
                    self.command = Some(crate::command::derive_stomp_command(ty)?);
                }
                self.kind = Some(AccessorKind::Stomp);
                Ok(())
            }
        }
    }

    #[must_use]
    pub const fn command(&self) -> Option<StompCommand> {
        self.command
    }

    /// Sets the STOMP command. Errors if the accessor is sealed.
    pub fn set_command(&mut self, command: StompCommand) -> Result<(), ProtocolError> {
        self.ensure_mutable()?;
        self.command = Some(command);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterates over the raw header key/value pairs, in sorted order. Does
    /// not include the STOMP command, which is tracked separately.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets a raw header value. Errors if the accessor is sealed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ProtocolError> {
        self.ensure_mutable()?;
        self.values.insert(key.into(), value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<(), ProtocolError> {
        self.ensure_mutable()?;
        self.values.remove(key);
        Ok(())
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.get(SESSION_ID)
    }

    pub fn set_session_id(&mut self, id: impl Into<String>) -> Result<(), ProtocolError> {
        self.set(SESSION_ID, id)
    }

    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.get(DESTINATION)
    }

    #[must_use]
    pub fn login(&self) -> Option<&str> {
        self.get(LOGIN)
    }

    #[must_use]
    pub fn passcode(&self) -> Option<&str> {
        self.get(PASSCODE)
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get(HOST)
    }

    #[must_use]
    pub fn accept_version(&self) -> Option<&str> {
        self.get(ACCEPT_VERSION)
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE_HEADER)
    }

    #[must_use]
    pub fn heart_beat(&self) -> Option<HeartBeat> {
        self.get(HEART_BEAT).and_then(HeartBeat::parse)
    }

    pub fn set_heart_beat(&mut self, hb: HeartBeat) -> Result<(), ProtocolError> {
        self.set(HEART_BEAT, hb.to_string())
    }

    /// Seals the accessor: all further `set`/`remove`/`set_command` calls
    /// return `ProtocolError::Sealed`. Irreversible.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn ensure_mutable(&self) -> Result<(), ProtocolError> {
        if self.sealed {
            Err(ProtocolError::Sealed)
        } else {
            Ok(())
        }
    }
}
