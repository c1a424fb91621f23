//! ReserveNow handler.

use rust_ocpp::v1_6::messages::reserve_now::{ReserveNowRequest, ReserveNowResponse};
use rust_ocpp::v1_6::types::ReservationStatus;
use serde_json::Value;
use tracing::info;

use super::{parse_payload, HandlerError, OcppHandler};
use crate::services::ReserveOutcome;

fn wire_status(outcome: ReserveOutcome) -> ReservationStatus {
    match outcome {
        ReserveOutcome::Accepted => ReservationStatus::Accepted,
        ReserveOutcome::Faulted => ReservationStatus::Faulted,
        ReserveOutcome::Occupied => ReservationStatus::Occupied,
        ReserveOutcome::Unavailable => ReservationStatus::Unavailable,
        ReserveOutcome::Rejected => ReservationStatus::Rejected,
    }
}

pub(crate) async fn handle_reserve_now(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: ReserveNowRequest = parse_payload("ReserveNow", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        reservation_id = req.reservation_id,
        id_tag = req.id_tag.as_str(),
        "ReserveNow"
    );

    let outcome = handler
        .reservations
        .reserve(
            &handler.charge_point_id,
            req.connector_id,
            req.reservation_id,
            &req.id_tag,
            req.parent_id_tag.clone(),
            req.expiry_date,
        )
        .await;

    let response = ReserveNowResponse {
        status: wire_status(outcome),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
