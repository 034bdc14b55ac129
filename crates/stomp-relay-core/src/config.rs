//! Relay configuration: the options enumerated by the relay controller plus
//! the defaults it falls back to when a field is left unset.

use serde::{Deserialize, Serialize};
use stomp_relay_protocol::HeaderAccessor;

const DEFAULT_RELAY_HOST: &str = "127.0.0.1";
const DEFAULT_RELAY_PORT: u16 = 61613;
const DEFAULT_CREDENTIAL: &str = "guest";
const DEFAULT_HEARTBEAT_MS: u64 = 10_000;

/// Configuration recognized by the relay controller.
///
/// `tcp_client` and `header_initializer` are not part of this struct: they
/// are injected programmatically (trait objects aren't `Deserialize`) via
/// [`crate::controller::RelayController::with_header_initializer`]. See
/// [`HeaderInitializer`] for the latter's hook trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub relay_host: String,
    pub relay_port: u16,
    pub client_login: String,
    pub client_passcode: String,
    pub system_login: String,
    pub system_passcode: String,
    /// Milliseconds; `0` disables. Defaults to 10000.
    pub system_heartbeat_send_interval_ms: u64,
    /// Milliseconds; `0` disables. Defaults to 10000.
    pub system_heartbeat_receive_interval_ms: u64,
    /// Overrides the STOMP `host` header on every CONNECT frame when set.
    pub virtual_host: Option<String>,
    /// Messages whose command requires a destination are dropped unless the
    /// destination starts with one of these prefixes. An empty set passes
    /// everything.
    pub destination_prefixes: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_host: DEFAULT_RELAY_HOST.to_string(),
            relay_port: DEFAULT_RELAY_PORT,
            client_login: DEFAULT_CREDENTIAL.to_string(),
            client_passcode: DEFAULT_CREDENTIAL.to_string(),
            system_login: DEFAULT_CREDENTIAL.to_string(),
            system_passcode: DEFAULT_CREDENTIAL.to_string(),
            system_heartbeat_send_interval_ms: DEFAULT_HEARTBEAT_MS,
            system_heartbeat_receive_interval_ms: DEFAULT_HEARTBEAT_MS,
            virtual_host: None,
            destination_prefixes: Vec::new(),
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates mandatory fields, returning the reason the first invalid
    /// one fails. Called at controller startup so a bad config never reaches
    /// the TCP layer.
    pub fn validate(&self) -> Result<(), String> {
        if self.relay_host.trim().is_empty() {
            return Err("relay_host must not be empty".into());
        }
        if self.relay_port == 0 {
            return Err("relay_port must not be 0".into());
        }
        if self.client_login.trim().is_empty() {
            return Err("client_login must not be empty".into());
        }
        if self.system_login.trim().is_empty() {
            return Err("system_login must not be empty".into());
        }
        Ok(())
    }

    /// Whether `destination` is allowed through the configured prefix
    /// filter. With no configured prefixes, everything passes.
    #[must_use]
    pub fn allows_destination(&self, destination: &str) -> bool {
        self.destination_prefixes.is_empty()
            || self.destination_prefixes.iter().any(|p| destination.starts_with(p.as_str()))
    }
}

/// Optional hook applied to outbound-to-application message headers before
/// they leave the relay (every frame `SessionHandler` hands to the
/// controller's outbound channel). Injected programmatically since trait
/// objects aren't `Deserialize`.
pub trait HeaderInitializer: Send + Sync {
    fn initialize(&self, headers: &mut HeaderAccessor);
}
