//! OCPP 1.6J codec
//!
//! Sits between the raw OCPP-J frame layer (`support::ocpp_frame`) and the
//! session handlers: validates the action name against the supported set,
//! deserializes payloads into `rust_ocpp::v1_6` request types, and maps
//! failures onto the protocol CALLERROR codes.

mod action;

pub use action::ChargerCall;

use serde_json::Value;

/// Charger-initiated actions the central system accepts.
pub const CHARGER_ACTIONS: &[&str] = &[
    "BootNotification",
    "Heartbeat",
    "StatusNotification",
    "Authorize",
    "StartTransaction",
    "StopTransaction",
    "MeterValues",
    "DataTransfer",
    "FirmwareStatusNotification",
    "DiagnosticsStatusNotification",
];

/// Server-initiated actions this system can dispatch to chargers.
pub const SERVER_ACTIONS: &[&str] = &[
    "RemoteStartTransaction",
    "RemoteStopTransaction",
    "Reset",
    "ChangeAvailability",
    "ChangeConfiguration",
    "GetConfiguration",
    "ClearCache",
    "TriggerMessage",
    "UnlockConnector",
    "GetDiagnostics",
    "UpdateFirmware",
    "ReserveNow",
    "CancelReservation",
    "SendLocalList",
    "GetLocalListVersion",
    "SetChargingProfile",
    "ClearChargingProfile",
    "GetCompositeSchedule",
];

/// OCPP-J CALLERROR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    OccurrenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

impl CallErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
        }
    }
}

impl std::fmt::Display for CallErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decode failure, carrying the CALLERROR to send back.
#[derive(Debug, Clone)]
pub struct CodecError {
    pub code: CallErrorCode,
    pub description: String,
}

impl CodecError {
    pub fn new(code: CallErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl std::error::Error for CodecError {}

/// Decode a charger-initiated CALL into its typed action.
pub fn decode_call(action: &str, payload: Value) -> Result<ChargerCall, CodecError> {
    if SERVER_ACTIONS.contains(&action) {
        return Err(CodecError::new(
            CallErrorCode::ProtocolError,
            format!("{} is a central-system action", action),
        ));
    }
    if !CHARGER_ACTIONS.contains(&action) {
        return Err(CodecError::new(
            CallErrorCode::NotImplemented,
            format!("Unknown action {}", action),
        ));
    }
    if !payload.is_object() {
        return Err(CodecError::new(
            CallErrorCode::TypeConstraintViolation,
            "Payload must be a JSON object",
        ));
    }

    ChargerCall::from_parts(action, payload)
        .map_err(|e| CodecError::new(CallErrorCode::FormationViolation, e.to_string()))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_boot_notification() {
        let call = decode_call(
            "BootNotification",
            json!({"chargePointVendor": "V", "chargePointModel": "M"}),
        )
        .unwrap();
        match call {
            ChargerCall::BootNotification(req) => {
                assert_eq!(req.charge_point_vendor, "V");
                assert_eq!(req.charge_point_model, "M");
            }
            other => panic!("unexpected action: {}", other.action_name()),
        }
    }

    #[test]
    fn decode_heartbeat_with_empty_payload() {
        let call = decode_call("Heartbeat", json!({})).unwrap();
        assert!(matches!(call, ChargerCall::Heartbeat(_)));
    }

    #[test]
    fn decode_start_transaction() {
        let call = decode_call(
            "StartTransaction",
            json!({
                "connectorId": 1,
                "idTag": "T1",
                "meterStart": 1000,
                "timestamp": "2025-01-01T00:00:00Z"
            }),
        )
        .unwrap();
        match call {
            ChargerCall::StartTransaction(req) => {
                assert_eq!(req.connector_id, 1);
                assert_eq!(req.id_tag, "T1");
                assert_eq!(req.meter_start, 1000);
            }
            other => panic!("unexpected action: {}", other.action_name()),
        }
    }

    #[test]
    fn unknown_action_is_not_implemented() {
        let err = decode_call("MakeCoffee", json!({})).unwrap_err();
        assert_eq!(err.code, CallErrorCode::NotImplemented);
    }

    #[test]
    fn server_action_from_charger_is_protocol_error() {
        let err = decode_call("RemoteStartTransaction", json!({"idTag": "T1"})).unwrap_err();
        assert_eq!(err.code, CallErrorCode::ProtocolError);
    }

    #[test]
    fn non_object_payload_is_type_violation() {
        let err = decode_call("Heartbeat", json!([1, 2])).unwrap_err();
        assert_eq!(err.code, CallErrorCode::TypeConstraintViolation);
    }

    #[test]
    fn missing_required_field_is_formation_violation() {
        let err = decode_call("BootNotification", json!({"chargePointVendor": "V"})).unwrap_err();
        assert_eq!(err.code, CallErrorCode::FormationViolation);
    }

    #[test]
    fn bad_enum_value_is_formation_violation() {
        let err = decode_call(
            "StatusNotification",
            json!({"connectorId": 1, "status": "Sleeping", "errorCode": "NoError"}),
        )
        .unwrap_err();
        assert_eq!(err.code, CallErrorCode::FormationViolation);
    }

    #[test]
    fn every_supported_action_has_a_distinct_name() {
        let mut all: Vec<&str> = CHARGER_ACTIONS
            .iter()
            .chain(SERVER_ACTIONS.iter())
            .copied()
            .collect();
        let len = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), len);
        assert_eq!(len, 28);
    }
}
