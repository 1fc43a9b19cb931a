//! GetConfiguration command

use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use tracing::info;

use super::{CommandError, SharedCommandSender};

pub async fn get_configuration(
    command_sender: &SharedCommandSender,
    charge_point_id: &str,
    keys: Option<Vec<String>>,
) -> Result<GetConfigurationResponse, CommandError> {
    info!(charge_point_id, ?keys, "GetConfiguration");

    let request = GetConfigurationRequest { key: keys };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(charge_point_id, "GetConfiguration", payload)
        .await?;

    serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))
}
