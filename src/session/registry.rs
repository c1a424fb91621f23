//! Session registry — the single source of truth for "is this station
//! online".

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::connection::Connection;

/// Thread-safe registry of active charge point connections, keyed by
/// charge point id.
pub struct SessionRegistry {
    sessions: DashMap<String, Connection>,
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn shared() -> SharedSessionRegistry {
        Arc::new(Self::new())
    }

    /// Register a connection. A later registration for the same id
    /// replaces the prior mapping (last-wins).
    pub fn register(&self, charge_point_id: &str, sender: mpsc::UnboundedSender<String>) {
        let connection = Connection::new(charge_point_id, sender);
        if self
            .sessions
            .insert(charge_point_id.to_string(), connection)
            .is_some()
        {
            info!(charge_point_id, "Replaced existing charge point session");
        } else {
            info!(charge_point_id, "Registered charge point session");
        }
    }

    pub fn unregister(&self, charge_point_id: &str) {
        if self.sessions.remove(charge_point_id).is_some() {
            info!(charge_point_id, "Unregistered charge point session");
        } else {
            warn!(charge_point_id, "Attempted to unregister unknown session");
        }
    }

    pub fn send_to(&self, charge_point_id: &str, message: String) -> Result<(), String> {
        match self.sessions.get(charge_point_id) {
            Some(conn) => conn.send(message),
            None => Err(format!("charge point {} not connected", charge_point_id)),
        }
    }

    pub fn touch(&self, charge_point_id: &str) {
        if let Some(mut conn) = self.sessions.get_mut(charge_point_id) {
            conn.touch();
        }
    }

    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.sessions.contains_key(charge_point_id)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("CP001", tx);

        assert!(registry.is_connected("CP001"));
        assert!(!registry.is_connected("CP002"));
        assert_eq!(registry.connected_ids(), vec!["CP001".to_string()]);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn unregister_removes_mapping() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("CP001", tx);
        registry.unregister("CP001");
        assert!(!registry.is_connected("CP001"));
    }

    #[test]
    fn later_registration_wins() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register("CP001", tx1);
        registry.register("CP001", tx2);

        assert_eq!(registry.count(), 1);
        registry.send_to("CP001", "ping".into()).unwrap();
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), "ping");
    }

    #[test]
    fn send_to_unknown_station_fails() {
        let registry = SessionRegistry::new();
        assert!(registry.send_to("CP404", "msg".into()).is_err());
    }
}
