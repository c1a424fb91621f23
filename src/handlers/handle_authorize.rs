//! Authorize handler.

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use serde_json::Value;
use tracing::info;

use super::{id_tag_info, parse_payload, HandlerError, OcppHandler};

pub(crate) async fn handle_authorize(
    handler: &OcppHandler,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let req: AuthorizeRequest = parse_payload("Authorize", payload)?;

    let status = handler.service.classify_id_tag(&req.id_tag).await;
    info!(
        charge_point_id = handler.charge_point_id.as_str(),
        id_tag = req.id_tag.as_str(),
        %status,
        "Authorize"
    );

    let response = AuthorizeResponse {
        id_tag_info: id_tag_info(status),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
