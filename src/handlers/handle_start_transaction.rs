//! StartTransaction handler.

use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use serde_json::Value;
use tracing::info;

use super::{id_tag_info, parse_payload, HandlerError, OcppHandler};
use crate::services::SessionStart;

pub(crate) async fn handle_start_transaction(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: StartTransactionRequest = parse_payload("StartTransaction", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    // A missing station record propagates: it indicates a consistency bug,
    // not a domain rejection.
    let outcome = handler
        .service
        .start_session(
            &handler.charge_point_id,
            req.connector_id,
            &req.id_tag,
            req.meter_start,
            req.timestamp,
        )
        .await?;

    let response = match outcome {
        SessionStart::Accepted(session) => StartTransactionResponse {
            transaction_id: session.id,
            id_tag_info: id_tag_info(crate::domain::IdTagStatus::Accepted),
        },
        SessionStart::Rejected(status) => StartTransactionResponse {
            transaction_id: 0,
            id_tag_info: id_tag_info(status),
        },
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
