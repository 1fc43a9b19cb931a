//! GetDiagnostics command

use rust_ocpp::v1_6::messages::get_diagnostics::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use tracing::info;

use super::{CommandError, SharedCommandSender};

/// Ask the charger to upload diagnostics to `location` (an upload URL).
/// Returns the file name the charger will use, when it reports one.
pub async fn get_diagnostics(
    command_sender: &SharedCommandSender,
    charge_point_id: &str,
    location: &str,
) -> Result<Option<String>, CommandError> {
    info!(charge_point_id, location, "GetDiagnostics");

    let request = GetDiagnosticsRequest {
        location: location.to_string(),
        retries: None,
        retry_interval: None,
        start_time: None,
        stop_time: None,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(charge_point_id, "GetDiagnostics", payload)
        .await?;

    let response: GetDiagnosticsResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(response.file_name)
}
