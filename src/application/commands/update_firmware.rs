//! UpdateFirmware command

use chrono::{DateTime, Utc};
use rust_ocpp::v1_6::messages::update_firmware::UpdateFirmwareRequest;
use tracing::info;

use super::{CommandError, SharedCommandSender};

/// Instruct the charger to download and install firmware from `location`
/// no earlier than `retrieve_date`. The response carries no payload; progress
/// arrives later as FirmwareStatusNotification messages.
pub async fn update_firmware(
    command_sender: &SharedCommandSender,
    charge_point_id: &str,
    location: &str,
    retrieve_date: DateTime<Utc>,
) -> Result<(), CommandError> {
    info!(charge_point_id, location, %retrieve_date, "UpdateFirmware");

    let request = UpdateFirmwareRequest {
        location: location.to_string(),
        retrieve_date,
        retries: None,
        retry_interval: None,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    command_sender
        .send_command(charge_point_id, "UpdateFirmware", payload)
        .await?;

    Ok(())
}
