//! Heartbeat handler.

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::debug;

use super::{HandlerError, OcppHandler};

pub(crate) async fn handle_heartbeat(
    handler: &OcppHandler,
    _payload: &Value,
) -> Result<Value, HandlerError> {
    debug!(charge_point_id = handler.charge_point_id.as_str(), "Heartbeat");

    // best-effort touch; the response never depends on it
    handler.service.heartbeat(&handler.charge_point_id).await;

    let response = HeartbeatResponse {
        current_time: Utc::now(),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}
