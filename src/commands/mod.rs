//! Outbound Central System → Charge Point commands.
//!
//! [`CommandSender`] is the version-agnostic transport layer: it frames
//! `[2, id, action, payload]` calls, tracks pending commands in a
//! correlation table keyed by `(chargePointId, messageId)`, and completes
//! each exactly once, either from the station's CallResult/CallError or
//! from the deadline elapsing. The per-verb modules build typed requests
//! on top of it; [`RemoteControl`] is the administrative façade.

pub mod change_availability;
pub mod change_configuration;
pub mod get_configuration;
pub mod remote_control;
pub mod remote_start;
pub mod remote_stop;
pub mod reset;
pub mod unlock_connector;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::audit::{append_detached, MessageRecord, SharedMessageLog};
use crate::session::SharedSessionRegistry;
use crate::shared::ocpp_frame::OcppFrame;

pub use change_availability::{change_availability, Availability};
pub use change_configuration::change_configuration;
pub use get_configuration::{get_configuration, ConfigurationResult, KeyValue};
pub use remote_control::RemoteControl;
pub use remote_start::remote_start_transaction;
pub use remote_stop::remote_stop_transaction;
pub use reset::{reset, ResetKind};
pub use unlock_connector::unlock_connector;

/// Default deadline for a station's response.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

struct PendingCommand {
    action: String,
    completion: oneshot::Sender<Result<Value, CommandError>>,
}

#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("charge point not connected: {0}")]
    NotConnected(String),
    #[error("failed to send: {0}")]
    SendFailed(String),
    #[error("command timed out")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },
}

/// Sends OCPP commands to charge points and correlates their responses.
pub struct CommandSender {
    session_registry: SharedSessionRegistry,
    message_log: SharedMessageLog,
    pending: DashMap<(String, String), PendingCommand>,
    response_timeout: Duration,
}

pub type SharedCommandSender = Arc<CommandSender>;

impl CommandSender {
    pub fn new(session_registry: SharedSessionRegistry, message_log: SharedMessageLog) -> Self {
        Self::with_timeout(session_registry, message_log, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(
        session_registry: SharedSessionRegistry,
        message_log: SharedMessageLog,
        response_timeout: Duration,
    ) -> Self {
        Self {
            session_registry,
            message_log,
            pending: DashMap::new(),
            response_timeout,
        }
    }

    pub fn shared(
        session_registry: SharedSessionRegistry,
        message_log: SharedMessageLog,
    ) -> SharedCommandSender {
        Arc::new(Self::new(session_registry, message_log))
    }

    /// Message ids must stay unique across process restarts, so they are
    /// random rather than counted.
    fn generate_message_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Send an OCPP command and wait for the station's response.
    ///
    /// Fails immediately with [`CommandError::NotConnected`] when the
    /// station has no live connection; nothing is registered in that case.
    /// Otherwise the pending entry is removed exactly once: by the
    /// response, by a synchronous send failure, or by the deadline.
    pub async fn send_command(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, CommandError> {
        if !self.session_registry.is_connected(charge_point_id) {
            return Err(CommandError::NotConnected(charge_point_id.to_string()));
        }

        let message_id = self.generate_message_id();
        let frame = OcppFrame::Call {
            unique_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };
        let json = frame.serialize();

        let (tx, rx) = oneshot::channel();
        let key = (charge_point_id.to_string(), message_id.clone());
        self.pending.insert(
            key.clone(),
            PendingCommand {
                action: action.to_string(),
                completion: tx,
            },
        );

        info!(
            charge_point_id,
            action,
            message_id = message_id.as_str(),
            "Sending command"
        );
        append_detached(
            &self.message_log,
            MessageRecord::outbound(charge_point_id, &json),
        );

        if let Err(e) = self.session_registry.send_to(charge_point_id, json) {
            self.pending.remove(&key);
            return Err(CommandError::SendFailed(e));
        }

        match timeout(self.response_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.remove(&key);
                Err(CommandError::InvalidResponse(
                    "completion channel closed".to_string(),
                ))
            }
            Err(_) => {
                self.pending.remove(&key);
                warn!(
                    charge_point_id,
                    action,
                    message_id = message_id.as_str(),
                    "Command timed out"
                );
                Err(CommandError::Timeout)
            }
        }
    }

    /// Route an inbound CallResult into the correlation table. A response
    /// with no pending entry (already timed out, or unknown id) is logged
    /// and dropped.
    pub fn handle_response(&self, charge_point_id: &str, message_id: &str, payload: Value) {
        let key = (charge_point_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            info!(
                charge_point_id,
                action = pending.action.as_str(),
                message_id,
                "Received command response"
            );
            let _ = pending.completion.send(Ok(payload));
        } else {
            warn!(
                charge_point_id,
                message_id, "Dropping response with no pending command (late or unknown id)"
            );
        }
    }

    /// Route an inbound CallError into the correlation table.
    pub fn handle_error(
        &self,
        charge_point_id: &str,
        message_id: &str,
        error_code: &str,
        error_description: &str,
    ) {
        let key = (charge_point_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            warn!(
                charge_point_id,
                action = pending.action.as_str(),
                message_id,
                error_code,
                error_description,
                "Received command error"
            );
            let _ = pending.completion.send(Err(CommandError::CallError {
                code: error_code.to_string(),
                description: error_description.to_string(),
            }));
        } else {
            warn!(
                charge_point_id,
                message_id, "Dropping error with no pending command (late or unknown id)"
            );
        }
    }

    /// Number of commands still awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryMessageLog;
    use crate::session::SessionRegistry;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn setup() -> (
        SharedCommandSender,
        SharedSessionRegistry,
        mpsc::UnboundedReceiver<String>,
    ) {
        let registry = SessionRegistry::shared();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("CP001", tx);
        let sender = Arc::new(CommandSender::with_timeout(
            registry.clone(),
            InMemoryMessageLog::shared(64),
            Duration::from_millis(200),
        ));
        (sender, registry, rx)
    }

    fn sent_message_id(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        let raw = rx.try_recv().expect("a frame should have been sent");
        match OcppFrame::parse(&raw).unwrap() {
            OcppFrame::Call { unique_id, .. } => unique_id,
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn not_connected_fails_immediately_without_registering() {
        let registry = SessionRegistry::shared();
        let sender = CommandSender::new(registry, InMemoryMessageLog::shared(64));

        let result = sender.send_command("CP404", "Reset", json!({})).await;
        assert!(matches!(result, Err(CommandError::NotConnected(_))));
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn response_completes_pending_command() {
        let (sender, _registry, mut rx) = setup();

        let send = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .send_command("CP001", "Reset", json!({"type": "Soft"}))
                    .await
            })
        };

        tokio::task::yield_now().await;
        let message_id = sent_message_id(&mut rx);
        sender.handle_response("CP001", &message_id, json!({"status": "Accepted"}));

        let result = send.await.unwrap().unwrap();
        assert_eq!(result["status"], "Accepted");
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn call_error_rejects_pending_command() {
        let (sender, _registry, mut rx) = setup();

        let send = {
            let sender = sender.clone();
            tokio::spawn(async move { sender.send_command("CP001", "Reset", json!({})).await })
        };

        tokio::task::yield_now().await;
        let message_id = sent_message_id(&mut rx);
        sender.handle_error("CP001", &message_id, "NotSupported", "nope");

        match send.await.unwrap() {
            Err(CommandError::CallError { code, description }) => {
                assert_eq!(code, "NotSupported");
                assert_eq!(description, "nope");
            }
            other => panic!("expected CallError, got {:?}", other),
        }
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn deadline_elapses_and_late_response_is_dropped() {
        let (sender, _registry, mut rx) = setup();

        let result = sender.send_command("CP001", "Reset", json!({})).await;
        assert!(matches!(result, Err(CommandError::Timeout)));
        assert_eq!(sender.pending_count(), 0);

        // A response arriving after the timeout finds no entry and must
        // not panic or resurrect the command.
        let message_id = sent_message_id(&mut rx);
        sender.handle_response("CP001", &message_id, json!({"status": "Accepted"}));
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn synchronous_send_failure_cancels_pending() {
        let registry = SessionRegistry::shared();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("CP001", tx);
        drop(rx); // writer task gone; sends now fail

        let sender = CommandSender::new(registry, InMemoryMessageLog::shared(64));
        let result = sender.send_command("CP001", "Reset", json!({})).await;
        assert!(matches!(result, Err(CommandError::SendFailed(_))));
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn response_for_wrong_station_does_not_match() {
        let (sender, _registry, mut rx) = setup();

        let send = {
            let sender = sender.clone();
            tokio::spawn(async move { sender.send_command("CP001", "Reset", json!({})).await })
        };

        tokio::task::yield_now().await;
        let message_id = sent_message_id(&mut rx);
        // same message id, different station: the key is the pair
        sender.handle_response("CP002", &message_id, json!({}));
        assert_eq!(sender.pending_count(), 1);

        sender.handle_response("CP001", &message_id, json!({}));
        assert!(send.await.unwrap().is_ok());
    }
}
