//! EVSE (connector) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::charge_point::ConnectorStatus;

/// Physical plug standard of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorType {
    Type1,
    Type2,
    CCS1,
    CCS2,
    GBT,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type1 => "Type1",
            Self::Type2 => "Type2",
            Self::CCS1 => "CCS1",
            Self::CCS2 => "CCS2",
            Self::GBT => "GBT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Type1" => Some(Self::Type1),
            "Type2" => Some(Self::Type2),
            "CCS1" => Some(Self::CCS1),
            "CCS2" => Some(Self::CCS2),
            "GBT" => Some(Self::GBT),
            _ => None,
        }
    }
}

/// One physical outlet of a charge point.
///
/// `(charge_point_id, connector_id)` is unique; connector ids are 1..N
/// (connector 0 addresses the whole station in OCPP and is not stored).
#[derive(Debug, Clone)]
pub struct Evse {
    pub id: i32,
    pub charge_point_id: String,
    pub connector_id: u32,
    pub connector_type: ConnectorType,
    pub status: ConnectorStatus,
    pub last_error_code: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Evse {
    pub fn new(charge_point_id: impl Into<String>, connector_id: u32) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            connector_id,
            connector_type: ConnectorType::Type2,
            status: ConnectorStatus::Unavailable,
            last_error_code: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.status == ConnectorStatus::Faulted
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_type_roundtrip() {
        for t in [
            ConnectorType::Type1,
            ConnectorType::Type2,
            ConnectorType::CCS1,
            ConnectorType::CCS2,
            ConnectorType::GBT,
        ] {
            assert_eq!(ConnectorType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ConnectorType::parse("Schuko"), None);
    }

    #[test]
    fn new_evse_defaults() {
        let evse = Evse::new("CP-001", 1);
        assert_eq!(evse.connector_id, 1);
        assert_eq!(evse.connector_type, ConnectorType::Type2);
        assert!(!evse.is_faulted());
    }
}
