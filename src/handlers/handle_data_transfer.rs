//! DataTransfer handler — routes by vendor id.

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;
use tracing::info;

use super::vendor::VendorReplyStatus;
use super::{parse_payload, HandlerError, OcppHandler};

fn wire_status(status: VendorReplyStatus) -> DataTransferStatus {
    match status {
        VendorReplyStatus::Accepted => DataTransferStatus::Accepted,
        VendorReplyStatus::Rejected => DataTransferStatus::Rejected,
        VendorReplyStatus::UnknownMessageId => DataTransferStatus::UnknownMessageId,
        VendorReplyStatus::UnknownVendorId => DataTransferStatus::UnknownVendorId,
    }
}

pub(crate) async fn handle_data_transfer(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: DataTransferRequest = parse_payload("DataTransfer", payload)?;

    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        vendor_id = req.vendor_string.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    let reply = handler
        .vendors
        .route(&req.vendor_string)
        .handle(
            &handler.charge_point_id,
            req.message_id.as_deref(),
            req.data.as_deref(),
        )
        .await;

    let response = DataTransferResponse {
        status: wire_status(reply.status),
        data: reply.data,
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
