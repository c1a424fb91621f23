//! OCPP 1.6 protocol engine.
//!
//! One [`OcppHandler`] serves one charge point connection. Inbound frames
//! are parsed into the OCPP-J envelope; Calls are dispatched by action
//! name to the `handle_*` modules, CallResult/CallError frames are routed
//! into the command correlation table. Every inbound and outbound frame is
//! audit-logged best-effort.

pub mod vendor;

mod handle_authorize;
mod handle_boot_notification;
mod handle_cancel_reservation;
mod handle_data_transfer;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_reserve_now;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;

use std::sync::Arc;

use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, warn};

use crate::audit::{append_detached, MessageRecord, SharedMessageLog};
use crate::commands::SharedCommandSender;
use crate::domain::IdTagStatus;
use crate::services::{ChargePointService, ReservationService};
use crate::shared::errors::DomainError;
use crate::shared::ocpp_frame::OcppFrame;
use vendor::VendorRegistry;

/// A fault raised while handling a Call, answered as a CallError. The
/// connection stays open either way.
#[derive(Debug)]
pub enum HandlerError {
    /// The payload failed typed deserialization.
    Malformed(String),
    /// A structural fault inside the handler. Domain rejections are not
    /// errors; they travel as success-shaped responses.
    Internal(DomainError),
}

impl HandlerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "FormationViolation",
            Self::Internal(_) => "InternalError",
        }
    }

    fn description(&self) -> String {
        match self {
            Self::Malformed(msg) => msg.clone(),
            Self::Internal(e) => e.to_string(),
        }
    }
}

impl From<DomainError> for HandlerError {
    fn from(e: DomainError) -> Self {
        Self::Internal(e)
    }
}

pub(crate) fn parse_payload<T: DeserializeOwned>(
    action: &str,
    payload: &Value,
) -> Result<T, HandlerError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| HandlerError::Malformed(format!("{} payload: {}", action, e)))
}

/// Map a domain authorization outcome to the wire IdTagInfo.
pub(crate) fn id_tag_info(status: IdTagStatus) -> IdTagInfo {
    let status = match status {
        IdTagStatus::Accepted => AuthorizationStatus::Accepted,
        IdTagStatus::Blocked => AuthorizationStatus::Blocked,
        IdTagStatus::Expired => AuthorizationStatus::Expired,
        IdTagStatus::Invalid => AuthorizationStatus::Invalid,
    };
    IdTagInfo {
        status,
        expiry_date: None,
        parent_id_tag: None,
    }
}

/// Per-connection OCPP 1.6 message handler.
pub struct OcppHandler {
    pub charge_point_id: String,
    pub service: Arc<ChargePointService>,
    pub reservations: Arc<ReservationService>,
    pub command_sender: SharedCommandSender,
    pub vendors: Arc<VendorRegistry>,
    pub message_log: SharedMessageLog,
    /// Heartbeat interval handed out in BootNotification responses.
    pub boot_interval_secs: u16,
}

impl OcppHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        charge_point_id: impl Into<String>,
        service: Arc<ChargePointService>,
        reservations: Arc<ReservationService>,
        command_sender: SharedCommandSender,
        vendors: Arc<VendorRegistry>,
        message_log: SharedMessageLog,
        boot_interval_secs: u16,
    ) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            service,
            reservations,
            command_sender,
            vendors,
            message_log,
            boot_interval_secs,
        }
    }

    /// Process one raw frame; the return value, if any, is the frame to
    /// send back on the same connection.
    pub async fn handle(&self, text: &str) -> Option<String> {
        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                // No request id is recoverable from a malformed envelope,
                // so no CallError can be addressed to it.
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    error = %e,
                    "Dropping malformed frame"
                );
                return None;
            }
        };

        append_detached(
            &self.message_log,
            MessageRecord::inbound(&self.charge_point_id, text),
        );

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => self.handle_call(&unique_id, &action, &payload).await,
            OcppFrame::CallResult { unique_id, payload } => {
                self.command_sender
                    .handle_response(&self.charge_point_id, &unique_id, payload);
                None
            }
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                self.command_sender.handle_error(
                    &self.charge_point_id,
                    &unique_id,
                    &error_code,
                    &error_description,
                );
                None
            }
        }
    }

    async fn handle_call(&self, unique_id: &str, action: &str, payload: &Value) -> Option<String> {
        let outcome = match action {
            "Authorize" => Some(handle_authorize::handle_authorize(self, payload).await),
            "BootNotification" => {
                Some(handle_boot_notification::handle_boot_notification(self, payload).await)
            }
            "CancelReservation" => {
                Some(handle_cancel_reservation::handle_cancel_reservation(self, payload).await)
            }
            "DataTransfer" => Some(handle_data_transfer::handle_data_transfer(self, payload).await),
            "Heartbeat" => Some(handle_heartbeat::handle_heartbeat(self, payload).await),
            "MeterValues" => Some(handle_meter_values::handle_meter_values(self, payload).await),
            "ReserveNow" => Some(handle_reserve_now::handle_reserve_now(self, payload).await),
            "StartTransaction" => {
                Some(handle_start_transaction::handle_start_transaction(self, payload).await)
            }
            "StatusNotification" => {
                Some(handle_status_notification::handle_status_notification(self, payload).await)
            }
            "StopTransaction" => {
                Some(handle_stop_transaction::handle_stop_transaction(self, payload).await)
            }
            _ => None,
        };

        let frame = match outcome {
            Some(Ok(result)) => OcppFrame::CallResult {
                unique_id: unique_id.to_string(),
                payload: result,
            },
            Some(Err(fault)) => {
                error!(
                    charge_point_id = self.charge_point_id.as_str(),
                    action,
                    code = fault.code(),
                    description = fault.description().as_str(),
                    "Call handling failed"
                );
                OcppFrame::error_response(unique_id, fault.code(), fault.description())
            }
            None => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    action, "Unknown action"
                );
                OcppFrame::error_response(
                    unique_id,
                    "NotImplemented",
                    format!("Action '{}' is not implemented", action),
                )
            }
        };

        let json = frame.serialize();
        append_detached(
            &self.message_log,
            MessageRecord::outbound(&self.charge_point_id, &json),
        );
        Some(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryMessageLog;
    use crate::commands::CommandSender;
    use crate::domain::IdTag;
    use crate::services::{ChargePointService, ReservationService};
    use crate::session::SessionRegistry;
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    pub(crate) struct Harness {
        pub handler: OcppHandler,
        pub storage: Arc<InMemoryStorage>,
    }

    pub(crate) fn harness(charge_point_id: &str) -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        storage.provision_charge_point("CP_001", 2);
        storage.provision_id_tag(IdTag::new("TAG1"));

        let registry = SessionRegistry::shared();
        let message_log = InMemoryMessageLog::shared(256);
        let command_sender = Arc::new(CommandSender::new(registry, message_log.clone()));
        let service = Arc::new(ChargePointService::new(storage.clone()));
        let reservations = Arc::new(ReservationService::new(storage.clone()));

        let handler = OcppHandler::new(
            charge_point_id,
            service,
            reservations,
            command_sender,
            Arc::new(VendorRegistry::new()),
            message_log,
            60,
        );
        Harness { handler, storage }
    }

    pub(crate) async fn call(
        handler: &OcppHandler,
        action: &str,
        payload: serde_json::Value,
    ) -> (String, Value) {
        let frame = OcppFrame::Call {
            unique_id: "m-1".to_string(),
            action: action.to_string(),
            payload,
        };
        let raw = handler.handle(&frame.serialize()).await.expect("a reply");
        match OcppFrame::parse(&raw).unwrap() {
            OcppFrame::CallResult { payload, .. } => ("CallResult".to_string(), payload),
            OcppFrame::CallError {
                error_code,
                error_description,
                ..
            } => (error_code, Value::String(error_description)),
            OcppFrame::Call { .. } => panic!("unexpected Call reply"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_silently() {
        let h = harness("CP_001");
        assert!(h.handler.handle("not a frame").await.is_none());
        assert!(h.handler.handle(r#"{"also": "wrong"}"#).await.is_none());
    }

    #[tokio::test]
    async fn unknown_action_answers_not_implemented() {
        let h = harness("CP_001");
        let (code, description) = call(&h.handler, "SignCertificate", json!({})).await;
        assert_eq!(code, "NotImplemented");
        assert!(description.as_str().unwrap().contains("SignCertificate"));
    }

    #[tokio::test]
    async fn malformed_payload_answers_formation_violation() {
        let h = harness("CP_001");
        let (code, _) = call(
            &h.handler,
            "StartTransaction",
            json!({"connectorId": "not a number"}),
        )
        .await;
        assert_eq!(code, "FormationViolation");
    }

    #[tokio::test]
    async fn handler_fault_answers_internal_error_without_closing() {
        // a connected station missing from the directory is a consistency
        // bug: StartTransaction propagates it as InternalError
        let h = harness("CP_GHOST");
        let (code, _) = call(
            &h.handler,
            "StartTransaction",
            json!({
                "connectorId": 1,
                "idTag": "TAG1",
                "meterStart": 0,
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .await;
        assert_eq!(code, "InternalError");

        // the handler still serves subsequent calls
        let (kind, _) = call(&h.handler, "Heartbeat", json!({})).await;
        assert_eq!(kind, "CallResult");
    }

    #[tokio::test]
    async fn call_result_routes_into_correlation_table() {
        let h = harness("CP_001");
        // no pending command: must be swallowed without a reply
        let reply = h
            .handler
            .handle(r#"[3,"no-such-id",{"status":"Accepted"}]"#)
            .await;
        assert!(reply.is_none());

        let reply = h
            .handler
            .handle(r#"[4,"no-such-id","InternalError","",{}]"#)
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn full_station_scenario() {
        let h = harness("CP_001");

        // Boot
        let (kind, payload) = call(
            &h.handler,
            "BootNotification",
            json!({"chargePointVendor": "Acme", "chargePointModel": "X1"}),
        )
        .await;
        assert_eq!(kind, "CallResult");
        assert_eq!(payload["status"], "Accepted");
        assert_eq!(payload["interval"], 60);

        // Connector 1 becomes Available
        let (kind, _) = call(
            &h.handler,
            "StatusNotification",
            json!({"connectorId": 1, "status": "Available", "errorCode": "NoError"}),
        )
        .await;
        assert_eq!(kind, "CallResult");

        // Start
        let (kind, payload) = call(
            &h.handler,
            "StartTransaction",
            json!({
                "connectorId": 1,
                "idTag": "TAG1",
                "meterStart": 1000,
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .await;
        assert_eq!(kind, "CallResult");
        assert_eq!(payload["idTagInfo"]["status"], "Accepted");
        let transaction_id = payload["transactionId"].as_i64().unwrap();
        assert!(transaction_id > 0);

        // Stop
        let (kind, payload) = call(
            &h.handler,
            "StopTransaction",
            json!({
                "transactionId": transaction_id,
                "meterStop": 1500,
                "timestamp": "2024-05-01T10:30:00Z"
            }),
        )
        .await;
        assert_eq!(kind, "CallResult");
        assert_eq!(payload["idTagInfo"]["status"], "Accepted");

        let session = h.storage.session(transaction_id as i32).unwrap();
        assert_eq!(session.energy_kwh, Some(0.5));
    }
}
