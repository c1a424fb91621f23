//! StopTransaction handler.

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use serde_json::Value;
use tracing::{error, info};

use super::handle_meter_values::collect_readings;
use super::{id_tag_info, parse_payload, HandlerError, OcppHandler};
use crate::domain::IdTagStatus;

pub(crate) async fn handle_stop_transaction(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: StopTransactionRequest = parse_payload("StopTransaction", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        reason = ?req.reason,
        "StopTransaction"
    );

    let transaction_data = req
        .transaction_data
        .as_deref()
        .map(|meter_values| collect_readings(req.transaction_id, 0, meter_values))
        .unwrap_or_default();

    // A stop is always acknowledged: rejecting it could leave the physical
    // charger unable to release the cable. Unknown transaction ids are a
    // no-op (stations retry, and stops race other close paths); internal
    // faults are logged and swallowed.
    match handler
        .service
        .stop_session(
            &handler.charge_point_id,
            req.transaction_id,
            req.meter_stop,
            req.timestamp,
            req.reason.as_ref().map(|r| format!("{:?}", r)),
            transaction_data,
        )
        .await
    {
        Ok(_) => {}
        Err(e) => {
            error!(
                charge_point_id = handler.charge_point_id.as_str(),
                transaction_id = req.transaction_id,
                error = %e,
                "Failed to stop transaction"
            );
        }
    }

    let response = StopTransactionResponse {
        id_tag_info: Some(id_tag_info(IdTagStatus::Accepted)),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
