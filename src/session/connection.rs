//! WebSocket connection abstraction.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// An active connection to a charge point. Messages are sent through the
/// mpsc channel drained by the connection's writer task.
#[derive(Debug)]
pub struct Connection {
    pub charge_point_id: String,
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Connection {
    pub fn new(charge_point_id: impl Into<String>, sender: mpsc::UnboundedSender<String>) -> Self {
        let now = Utc::now();
        Self {
            charge_point_id: charge_point_id.into(),
            sender,
            connected_at: now,
            last_activity: now,
        }
    }

    pub fn send(&self, message: String) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|e| format!("failed to send message: {}", e))
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_stale(&self, timeout_seconds: i64) -> bool {
        Utc::now()
            .signed_duration_since(self.last_activity)
            .num_seconds()
            > timeout_seconds
    }
}
