//! MQTT message envelope.
//!
//! Over MQTT the OCPP-J tuple framing is replaced by a small JSON object:
//!
//! - call:   `{"action": "<Action>", "messageId": "...", "payload": {...}}`
//! - result: `{"messageId": "...", "payload": {...}}`
//! - error:  `{"messageId": "...", "errorCode": "...", "errorDescription": "...", "errorDetails": {...}}`
//!
//! This module converts between that envelope and `OcppFrame`; all further
//! validation (message id length, action set, payload shape) happens in the
//! shared codec path.

use serde_json::Value;

use crate::support::ocpp_frame::OcppFrame;

/// Envelope translation errors.
#[derive(Debug)]
pub enum EnvelopeError {
    InvalidJson(String),
    NotAnObject,
    MissingMessageId,
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
            Self::NotAnObject => write!(f, "envelope must be a JSON object"),
            Self::MissingMessageId => write!(f, "envelope missing messageId"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Stateless envelope codec.
pub struct MqttEnvelope;

impl MqttEnvelope {
    /// Parse an envelope into the equivalent OCPP-J frame.
    pub fn parse(text: &str) -> Result<OcppFrame, EnvelopeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
        let obj = value.as_object().ok_or(EnvelopeError::NotAnObject)?;

        let message_id = obj
            .get("messageId")
            .and_then(|v| v.as_str())
            .ok_or(EnvelopeError::MissingMessageId)?
            .to_string();

        if let Some(action) = obj.get("action").and_then(|v| v.as_str()) {
            return Ok(OcppFrame::Call {
                message_id,
                action: action.to_string(),
                payload: obj
                    .get("payload")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default())),
            });
        }

        if let Some(error_code) = obj.get("errorCode").and_then(|v| v.as_str()) {
            return Ok(OcppFrame::CallError {
                message_id,
                error_code: error_code.to_string(),
                error_description: obj
                    .get("errorDescription")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                error_details: obj
                    .get("errorDetails")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default())),
            });
        }

        Ok(OcppFrame::CallResult {
            message_id,
            payload: obj
                .get("payload")
                .cloned()
                .unwrap_or(Value::Object(Default::default())),
        })
    }

    /// Build the envelope JSON for an outbound frame.
    pub fn build(frame: &OcppFrame) -> String {
        let value = match frame {
            OcppFrame::Call {
                message_id,
                action,
                payload,
            } => serde_json::json!({
                "action": action,
                "messageId": message_id,
                "payload": payload,
            }),
            OcppFrame::CallResult {
                message_id,
                payload,
            } => serde_json::json!({
                "messageId": message_id,
                "payload": payload,
            }),
            OcppFrame::CallError {
                message_id,
                error_code,
                error_description,
                error_details,
            } => serde_json::json!({
                "messageId": message_id,
                "errorCode": error_code,
                "errorDescription": error_description,
                "errorDetails": error_details,
            }),
        };
        value.to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_call_envelope() {
        let text = r#"{"action":"BootNotification","messageId":"m-1","payload":{"chargePointVendor":"V","chargePointModel":"M"}}"#;
        let frame = MqttEnvelope::parse(text).unwrap();
        match frame {
            OcppFrame::Call {
                message_id,
                action,
                payload,
            } => {
                assert_eq!(message_id, "m-1");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "V");
            }
            _ => panic!("expected Call"),
        }
    }

    #[test]
    fn parse_result_envelope() {
        let text = r#"{"messageId":"m-2","payload":{"status":"Accepted"}}"#;
        let frame = MqttEnvelope::parse(text).unwrap();
        assert!(frame.is_call_result());
        assert_eq!(frame.message_id(), "m-2");
    }

    #[test]
    fn parse_error_envelope() {
        let text = r#"{"messageId":"m-3","errorCode":"NotSupported","errorDescription":"nope"}"#;
        let frame = MqttEnvelope::parse(text).unwrap();
        match frame {
            OcppFrame::CallError {
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(error_code, "NotSupported");
                assert_eq!(error_description, "nope");
            }
            _ => panic!("expected CallError"),
        }
    }

    #[test]
    fn missing_message_id_is_error() {
        let text = r#"{"action":"Heartbeat","payload":{}}"#;
        assert!(matches!(
            MqttEnvelope::parse(text),
            Err(EnvelopeError::MissingMessageId)
        ));
    }

    #[test]
    fn roundtrip_through_envelope() {
        let frame = OcppFrame::Call {
            message_id: "m-42".into(),
            action: "StartTransaction".into(),
            payload: json!({"connectorId": 1, "idTag": "T1", "meterStart": 1000, "timestamp": "2025-01-01T00:00:00Z"}),
        };
        let text = MqttEnvelope::build(&frame);
        let parsed = MqttEnvelope::parse(&text).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn result_envelope_roundtrip() {
        let frame = OcppFrame::result("m-7", json!({"transactionId": 7}));
        let parsed = MqttEnvelope::parse(&MqttEnvelope::build(&frame)).unwrap();
        assert_eq!(parsed, frame);
    }
}
