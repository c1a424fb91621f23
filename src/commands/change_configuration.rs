//! ChangeConfiguration command.

use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use tracing::info;

use super::{CommandError, SharedCommandSender};

pub async fn change_configuration(
    command_sender: &SharedCommandSender,
    charge_point_id: &str,
    key: &str,
    value: &str,
) -> Result<String, CommandError> {
    info!(charge_point_id, key, value, "ChangeConfiguration");

    let request = ChangeConfigurationRequest {
        key: key.to_string(),
        value: value.to_string(),
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(charge_point_id, "ChangeConfiguration", payload)
        .await?;

    let response: ChangeConfigurationResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}
