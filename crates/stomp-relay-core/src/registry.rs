//! Concurrent session id -> session handler mapping.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::SessionHandler;

/// A concurrent mapping from session id to its handler.
///
/// Insert/remove are linearizable per key (backed by `DashMap`'s sharded
/// locking). A CONNECT for a session id already present replaces the prior
/// handler outright: the displaced handler's TCP connection is not closed
/// here; it is left to tear itself down on its own next TCP event, per the
/// relay's documented (if debatable) leak-tolerant replacement policy.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandler>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    /// Inserts `handler`, returning the handler it displaced, if any.
    pub fn insert(&self, session_id: impl Into<String>, handler: Arc<SessionHandler>) -> Option<Arc<SessionHandler>> {
        self.sessions.insert(session_id.into(), handler)
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandler>> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<SessionHandler>> {
        self.sessions.remove(session_id).map(|(_, handler)| handler)
    }

    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionHandler, SessionRole};
    use stomp_relay_protocol::HeaderAccessor;

    fn handler(id: &str) -> Arc<SessionHandler> {
        Arc::new(SessionHandler::new_for_test(id, SessionRole::Client, HeaderAccessor::new()))
    }

    #[test]
    fn insert_then_lookup() {
        let registry = SessionRegistry::new();
        registry.insert("A", handler("A"));
        assert!(registry.contains("A"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reinserting_replaces_without_panicking() {
        let registry = SessionRegistry::new();
        registry.insert("A", handler("A"));
        let displaced = registry.insert("A", handler("A"));
        assert!(displaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_clears_the_slot() {
        let registry = SessionRegistry::new();
        registry.insert("A", handler("A"));
        assert!(registry.remove("A").is_some());
        assert!(!registry.contains("A"));
    }
}
