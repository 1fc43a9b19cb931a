//! Charge point entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OCPP 1.6 connector/charge-point status as reported by StatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::SuspendedEV => "SuspendedEV",
            Self::SuspendedEVSE => "SuspendedEVSE",
            Self::Finishing => "Finishing",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(Self::Available),
            "Preparing" => Some(Self::Preparing),
            "Charging" => Some(Self::Charging),
            "SuspendedEV" => Some(Self::SuspendedEV),
            "SuspendedEVSE" => Some(Self::SuspendedEVSE),
            "Finishing" => Some(Self::Finishing),
            "Reserved" => Some(Self::Reserved),
            "Unavailable" => Some(Self::Unavailable),
            "Faulted" => Some(Self::Faulted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-controlled availability, orthogonal to the physical status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalStatus {
    Enabled,
    Disabled,
    Maintenance,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENABLED" => Some(Self::Enabled),
            "DISABLED" => Some(Self::Disabled),
            "MAINTENANCE" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic placement of a charge point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

impl Location {
    pub fn is_set(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// One logical OCPP endpoint.
///
/// Created on first accepted BootNotification or by operator pre-provisioning.
/// Never hard-deleted while sessions reference it; retirement is
/// `operational_status = Disabled`.
#[derive(Debug, Clone)]
pub struct ChargePoint {
    pub id: String,
    pub device_serial: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub physical_status: ConnectorStatus,
    pub operational_status: OperationalStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub location: Location,
    /// COP per kWh; `None` until the operator configures pricing.
    pub price_per_kwh: Option<Decimal>,
    /// Nominal charging rate in kW.
    pub charging_rate_kw: Option<f64>,
    pub registered_at: DateTime<Utc>,
}

impl ChargePoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_serial: None,
            vendor: None,
            model: None,
            firmware_version: None,
            physical_status: ConnectorStatus::Unavailable,
            operational_status: OperationalStatus::Enabled,
            last_seen: None,
            location: Location::default(),
            price_per_kwh: None,
            charging_rate_kw: None,
            registered_at: Utc::now(),
        }
    }

    /// A charge point is configured once it has both a location and pricing.
    pub fn is_configured(&self) -> bool {
        self.location.is_set() && self.price_per_kwh.is_some()
    }

    /// Available to drivers: physically Available and operator-enabled.
    pub fn is_available(&self) -> bool {
        self.physical_status == ConnectorStatus::Available
            && self.operational_status == OperationalStatus::Enabled
    }

    pub fn touch(&mut self) {
        self.last_seen = Some(Utc::now());
    }
}

/// Strip a charger-supplied id down to alphanumerics. Chargers have been seen
/// sending ids with slashes and wildcards, which would corrupt MQTT topics.
pub fn sanitize_charge_point_id(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn new_charge_point_is_unconfigured() {
        let cp = ChargePoint::new("CP-001");
        assert!(!cp.is_configured());
        assert!(!cp.is_available());
        assert_eq!(cp.operational_status, OperationalStatus::Enabled);
    }

    #[test]
    fn configured_requires_location_and_pricing() {
        let mut cp = ChargePoint::new("CP-001");
        cp.location = Location {
            latitude: Some(4.711),
            longitude: Some(-74.072),
            address: Some("Bogotá".into()),
        };
        assert!(!cp.is_configured());
        cp.price_per_kwh = Some(Decimal::new(270000, 2));
        assert!(cp.is_configured());
    }

    #[test]
    fn available_requires_both_flags() {
        let mut cp = ChargePoint::new("CP-001");
        cp.physical_status = ConnectorStatus::Available;
        assert!(cp.is_available());
        cp.operational_status = OperationalStatus::Maintenance;
        assert!(!cp.is_available());
        cp.operational_status = OperationalStatus::Enabled;
        cp.physical_status = ConnectorStatus::Charging;
        assert!(!cp.is_available());
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            ConnectorStatus::Available,
            ConnectorStatus::Preparing,
            ConnectorStatus::Charging,
            ConnectorStatus::SuspendedEV,
            ConnectorStatus::SuspendedEVSE,
            ConnectorStatus::Finishing,
            ConnectorStatus::Reserved,
            ConnectorStatus::Unavailable,
            ConnectorStatus::Faulted,
        ] {
            assert_eq!(ConnectorStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ConnectorStatus::parse("Offline"), None);
    }

    #[test]
    fn operational_string_roundtrip() {
        for s in [
            OperationalStatus::Enabled,
            OperationalStatus::Disabled,
            OperationalStatus::Maintenance,
        ] {
            assert_eq!(OperationalStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn sanitize_strips_special_characters() {
        assert_eq!(
            sanitize_charge_point_id("CP/00*1").as_deref(),
            Some("CP001")
        );
        assert_eq!(sanitize_charge_point_id("abc123").as_deref(), Some("abc123"));
        assert_eq!(sanitize_charge_point_id("///"), None);
    }
}
