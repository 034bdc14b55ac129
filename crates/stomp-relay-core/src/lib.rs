//! Relay controller, session handler, registry, and broker-availability
//! publisher for the STOMP relay.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod registry;
pub mod session;

pub use config::{HeaderInitializer, RelayConfig};
pub use controller::{RelayController, RelayShared};
pub use error::{RelayError, RelayResult};
pub use events::{BrokerAvailabilityPublisher, BrokerEvent};
pub use registry::SessionRegistry;
pub use session::{SessionHandler, SessionRole, SessionState};
