//! StatusNotification handler.

use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use serde_json::Value;
use tracing::{info, warn};

use super::{parse_payload, HandlerError, OcppHandler};
use crate::domain::ConnectorStatus;

fn connector_status(status: ChargePointStatus) -> ConnectorStatus {
    match status {
        ChargePointStatus::Available => ConnectorStatus::Available,
        ChargePointStatus::Preparing => ConnectorStatus::Preparing,
        ChargePointStatus::Charging => ConnectorStatus::Charging,
        ChargePointStatus::SuspendedEV => ConnectorStatus::SuspendedEV,
        ChargePointStatus::SuspendedEVSE => ConnectorStatus::SuspendedEVSE,
        ChargePointStatus::Finishing => ConnectorStatus::Finishing,
        ChargePointStatus::Reserved => ConnectorStatus::Reserved,
        ChargePointStatus::Unavailable => ConnectorStatus::Unavailable,
        ChargePointStatus::Faulted => ConnectorStatus::Faulted,
    }
}

pub(crate) async fn handle_status_notification(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: StatusNotificationRequest = parse_payload("StatusNotification", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        status = ?req.status,
        error_code = ?req.error_code,
        "StatusNotification"
    );

    let status = connector_status(req.status);

    // Directory faults stay invisible to the station; the notification is
    // acknowledged regardless.
    let result = if req.connector_id == 0 {
        // connector 0 is the station itself
        handler
            .service
            .update_station_status(&handler.charge_point_id, status)
            .await
    } else {
        let error_code = match req.error_code {
            ChargePointErrorCode::NoError => None,
            other => Some(format!("{:?}", other)),
        };
        handler
            .service
            .update_connector_status(
                &handler.charge_point_id,
                req.connector_id,
                status,
                error_code,
                req.info.clone(),
                req.vendor_error_code.clone(),
            )
            .await
    };

    if let Err(e) = result {
        warn!(
            charge_point_id = handler.charge_point_id.as_str(),
            connector_id = req.connector_id,
            error = %e,
            "Failed to persist status notification"
        );
    }

    Ok(serde_json::to_value(&StatusNotificationResponse {}).unwrap_or_default())
}
