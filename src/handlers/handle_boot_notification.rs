//! BootNotification handler.

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::{info, warn};

use super::{parse_payload, HandlerError, OcppHandler};

pub(crate) async fn handle_boot_notification(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: BootNotificationRequest = parse_payload("BootNotification", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        "BootNotification"
    );

    // Admission control: only stations already provisioned in the
    // directory are accepted; a boot cannot self-bootstrap a station.
    let status = match handler
        .service
        .register_station(
            &handler.charge_point_id,
            &req.charge_point_vendor,
            &req.charge_point_model,
            req.charge_point_serial_number.as_deref(),
            req.firmware_version.as_deref(),
        )
        .await
    {
        Ok(Some(_)) => RegistrationStatus::Accepted,
        Ok(None) => RegistrationStatus::Rejected,
        Err(e) => {
            warn!(
                charge_point_id = handler.charge_point_id.as_str(),
                error = %e,
                "BootNotification registration failed"
            );
            RegistrationStatus::Rejected
        }
    };

    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: handler.boot_interval_secs.into(),
        status,
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
