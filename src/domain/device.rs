//! Physical device identity and MQTT credentials

use chrono::{DateTime, Utc};

/// Identity of a physical unit, provisioned before (or at) first contact.
///
/// The master secret is stored encrypted; the per-device MQTT password is
/// derived from it and never stored.
#[derive(Debug, Clone)]
pub struct Device {
    /// Serial number, unique, primary identity.
    pub serial_number: String,
    /// Device family code used in MQTT topics and client ids ("zcf", "abb", …).
    pub type_code: String,
    /// Encrypted master secret (opaque to the core).
    pub master_secret_encrypted: String,
    /// Algorithm label of the stored secret.
    pub encryption_algorithm: String,
    /// Optional explicit MQTT client id; defaults to `{type_code}&{serial}`.
    pub mqtt_client_id: Option<String>,
    pub is_active: bool,
    pub last_connected: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(
        serial_number: impl Into<String>,
        type_code: impl Into<String>,
        master_secret_encrypted: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            type_code: type_code.into(),
            master_secret_encrypted: master_secret_encrypted.into(),
            encryption_algorithm: "AES-256-GCM".to_string(),
            mqtt_client_id: None,
            is_active: true,
            last_connected: None,
            created_at: Utc::now(),
        }
    }

    /// MQTT client id for this device: explicit override or
    /// `{type_code}&{serial_number}`.
    pub fn client_id(&self) -> String {
        self.mqtt_client_id
            .clone()
            .unwrap_or_else(|| format!("{}&{}", self.type_code, self.serial_number))
    }

    /// MQTT username (the serial number).
    pub fn username(&self) -> &str {
        &self.serial_number
    }

    /// Topic the device publishes OCPP messages to.
    pub fn up_topic(&self) -> String {
        format!("{}/{}/user/up", self.type_code, self.serial_number)
    }

    /// Topic the device listens on for server messages.
    pub fn down_topic(&self) -> String {
        format!("{}/{}/user/down", self.type_code, self.serial_number)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_mqtt_identifiers() {
        let device = Device::new("861076087029615", "zcf", "enc");
        assert_eq!(device.client_id(), "zcf&861076087029615");
        assert_eq!(device.username(), "861076087029615");
        assert_eq!(device.up_topic(), "zcf/861076087029615/user/up");
        assert_eq!(device.down_topic(), "zcf/861076087029615/user/down");
    }

    #[test]
    fn explicit_client_id_wins() {
        let mut device = Device::new("SN1", "abb", "enc");
        device.mqtt_client_id = Some("custom-client".into());
        assert_eq!(device.client_id(), "custom-client");
    }
}
