//! CancelReservation handler.

use rust_ocpp::v1_6::messages::cancel_reservation::{
    CancelReservationRequest, CancelReservationResponse,
};
use rust_ocpp::v1_6::types::CancelReservationStatus;
use serde_json::Value;
use tracing::info;

use super::{parse_payload, HandlerError, OcppHandler};

pub(crate) async fn handle_cancel_reservation(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: CancelReservationRequest = parse_payload("CancelReservation", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        reservation_id = req.reservation_id,
        "CancelReservation"
    );

    let cancelled = handler
        .reservations
        .cancel(&handler.charge_point_id, req.reservation_id)
        .await;

    let response = CancelReservationResponse {
        status: if cancelled {
            CancelReservationStatus::Accepted
        } else {
            CancelReservationStatus::Rejected
        },
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
