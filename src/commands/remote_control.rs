//! Remote control façade.
//!
//! Maps administrative verbs directly onto [`CommandSender::send_command`]
//! via the per-verb modules, surfacing each command's resolution or
//! [`CommandError`] unmodified. Audit logging of administrative actions is
//! the caller's responsibility.

use super::{
    change_availability, change_configuration, get_configuration, remote_start_transaction,
    remote_stop_transaction, reset, unlock_connector, Availability, CommandError,
    ConfigurationResult, ResetKind, SharedCommandSender,
};

pub struct RemoteControl {
    command_sender: SharedCommandSender,
}

impl RemoteControl {
    pub fn new(command_sender: SharedCommandSender) -> Self {
        Self { command_sender }
    }

    pub async fn remote_start(
        &self,
        charge_point_id: &str,
        id_tag: &str,
        connector_id: Option<u32>,
    ) -> Result<String, CommandError> {
        remote_start_transaction(&self.command_sender, charge_point_id, id_tag, connector_id).await
    }

    pub async fn remote_stop(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> Result<String, CommandError> {
        remote_stop_transaction(&self.command_sender, charge_point_id, transaction_id).await
    }

    pub async fn change_availability(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        availability: Availability,
    ) -> Result<String, CommandError> {
        change_availability(
            &self.command_sender,
            charge_point_id,
            connector_id,
            availability,
        )
        .await
    }

    pub async fn reset(
        &self,
        charge_point_id: &str,
        kind: ResetKind,
    ) -> Result<String, CommandError> {
        reset(&self.command_sender, charge_point_id, kind).await
    }

    pub async fn unlock_connector(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> Result<String, CommandError> {
        unlock_connector(&self.command_sender, charge_point_id, connector_id).await
    }

    pub async fn get_configuration(
        &self,
        charge_point_id: &str,
        keys: Option<Vec<String>>,
    ) -> Result<ConfigurationResult, CommandError> {
        get_configuration(&self.command_sender, charge_point_id, keys).await
    }

    pub async fn change_configuration(
        &self,
        charge_point_id: &str,
        key: &str,
        value: &str,
    ) -> Result<String, CommandError> {
        change_configuration(&self.command_sender, charge_point_id, key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryMessageLog;
    use crate::commands::CommandSender;
    use crate::session::SessionRegistry;
    use crate::shared::ocpp_frame::OcppFrame;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn remote_start_round_trip() {
        let registry = SessionRegistry::shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("CP001", tx);
        let sender = Arc::new(CommandSender::new(
            registry.clone(),
            InMemoryMessageLog::shared(16),
        ));
        let remote = RemoteControl::new(sender.clone());

        let call = tokio::spawn(async move { remote.remote_start("CP001", "TAG1", Some(1)).await });

        tokio::task::yield_now().await;
        let raw = rx.recv().await.unwrap();
        let (message_id, action, payload) = match OcppFrame::parse(&raw).unwrap() {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => (unique_id, action, payload),
            other => panic!("expected Call, got {:?}", other),
        };
        assert_eq!(action, "RemoteStartTransaction");
        assert_eq!(payload["idTag"], "TAG1");
        assert_eq!(payload["connectorId"], 1);

        sender.handle_response("CP001", &message_id, serde_json::json!({"status": "Accepted"}));
        assert_eq!(call.await.unwrap().unwrap(), "Accepted");
    }

    #[tokio::test]
    async fn commands_to_offline_station_surface_not_connected() {
        let registry = SessionRegistry::shared();
        let sender = Arc::new(CommandSender::new(registry, InMemoryMessageLog::shared(16)));
        let remote = RemoteControl::new(sender);

        let result = remote.remote_stop("CP404", 42).await;
        assert!(matches!(result, Err(CommandError::NotConnected(_))));
    }
}
