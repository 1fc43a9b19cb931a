//! Typed charger-initiated actions.

use rust_ocpp::v1_6::messages::authorize::AuthorizeRequest;
use rust_ocpp::v1_6::messages::boot_notification::BootNotificationRequest;
use rust_ocpp::v1_6::messages::data_transfer::DataTransferRequest;
use rust_ocpp::v1_6::messages::diagnostics_status_notification::DiagnosticsStatusNotificationRequest;
use rust_ocpp::v1_6::messages::firmware_status_notification::FirmwareStatusNotificationRequest;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatRequest;
use rust_ocpp::v1_6::messages::meter_values::MeterValuesRequest;
use rust_ocpp::v1_6::messages::start_transaction::StartTransactionRequest;
use rust_ocpp::v1_6::messages::status_notification::StatusNotificationRequest;
use rust_ocpp::v1_6::messages::stop_transaction::StopTransactionRequest;
use serde_json::Value;

/// A decoded, validated charger-initiated CALL.
///
/// The session's handler match over this enum is exhaustive; adding a new
/// supported action extends this type and the codec together.
#[derive(Debug, Clone)]
pub enum ChargerCall {
    Authorize(AuthorizeRequest),
    BootNotification(BootNotificationRequest),
    DataTransfer(DataTransferRequest),
    DiagnosticsStatusNotification(DiagnosticsStatusNotificationRequest),
    FirmwareStatusNotification(FirmwareStatusNotificationRequest),
    Heartbeat(HeartbeatRequest),
    MeterValues(MeterValuesRequest),
    StartTransaction(StartTransactionRequest),
    StatusNotification(StatusNotificationRequest),
    StopTransaction(StopTransactionRequest),
}

impl ChargerCall {
    /// Deserialize the payload of a named action. The caller has already
    /// checked the action against the supported set.
    pub fn from_parts(action: &str, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match action {
            "Authorize" => Self::Authorize(serde_json::from_value(payload)?),
            "BootNotification" => Self::BootNotification(serde_json::from_value(payload)?),
            "DataTransfer" => Self::DataTransfer(serde_json::from_value(payload)?),
            "DiagnosticsStatusNotification" => {
                Self::DiagnosticsStatusNotification(serde_json::from_value(payload)?)
            }
            "FirmwareStatusNotification" => {
                Self::FirmwareStatusNotification(serde_json::from_value(payload)?)
            }
            "Heartbeat" => Self::Heartbeat(serde_json::from_value(payload)?),
            "MeterValues" => Self::MeterValues(serde_json::from_value(payload)?),
            "StartTransaction" => Self::StartTransaction(serde_json::from_value(payload)?),
            "StatusNotification" => Self::StatusNotification(serde_json::from_value(payload)?),
            "StopTransaction" => Self::StopTransaction(serde_json::from_value(payload)?),
            other => unreachable!("action {} not in the supported set", other),
        })
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Authorize(_) => "Authorize",
            Self::BootNotification(_) => "BootNotification",
            Self::DataTransfer(_) => "DataTransfer",
            Self::DiagnosticsStatusNotification(_) => "DiagnosticsStatusNotification",
            Self::FirmwareStatusNotification(_) => "FirmwareStatusNotification",
            Self::Heartbeat(_) => "Heartbeat",
            Self::MeterValues(_) => "MeterValues",
            Self::StartTransaction(_) => "StartTransaction",
            Self::StatusNotification(_) => "StatusNotification",
            Self::StopTransaction(_) => "StopTransaction",
        }
    }
}
