//! Append-only device event log

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Kind of audit event recorded for a charge point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Boot,
    Heartbeat,
    StatusChange,
    Authorize,
    TransactionStart,
    TransactionStop,
    MeterValues,
    Connect,
    Disconnect,
    DecodeError,
    ClockSkew,
    InboxOverflow,
    StopWithoutSession,
    DataTransfer,
    FirmwareStatus,
    DiagnosticsStatus,
    CommandSent,
    CommandResult,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Heartbeat => "heartbeat",
            Self::StatusChange => "status_change",
            Self::Authorize => "authorize",
            Self::TransactionStart => "transaction_start",
            Self::TransactionStop => "transaction_stop",
            Self::MeterValues => "meter_values",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::DecodeError => "decode_error",
            Self::ClockSkew => "clock_skew",
            Self::InboxOverflow => "inbox_overflow",
            Self::StopWithoutSession => "stop_without_session",
            Self::DataTransfer => "data_transfer",
            Self::FirmwareStatus => "firmware_status",
            Self::DiagnosticsStatus => "diagnostics_status",
            Self::CommandSent => "command_sent",
            Self::CommandResult => "command_result",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "boot" => Some(Self::Boot),
            "heartbeat" => Some(Self::Heartbeat),
            "status_change" => Some(Self::StatusChange),
            "authorize" => Some(Self::Authorize),
            "transaction_start" => Some(Self::TransactionStart),
            "transaction_stop" => Some(Self::TransactionStop),
            "meter_values" => Some(Self::MeterValues),
            "connect" => Some(Self::Connect),
            "disconnect" => Some(Self::Disconnect),
            "decode_error" => Some(Self::DecodeError),
            "clock_skew" => Some(Self::ClockSkew),
            "inbox_overflow" => Some(Self::InboxOverflow),
            "stop_without_session" => Some(Self::StopWithoutSession),
            "data_transfer" => Some(Self::DataTransfer),
            "firmware_status" => Some(Self::FirmwareStatus),
            "diagnostics_status" => Some(Self::DiagnosticsStatus),
            "command_sent" => Some(Self::CommandSent),
            "command_result" => Some(Self::CommandResult),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit row. The core only appends; retention/purge is an external job.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub id: i32,
    pub charge_point_id: String,
    pub evse_id: Option<u32>,
    pub kind: EventKind,
    pub payload: Option<Value>,
    /// New / previous status for `StatusChange` events.
    pub status: Option<String>,
    pub previous_status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DeviceEvent {
    pub fn new(charge_point_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            evse_id: None,
            kind,
            payload: None,
            status: None,
            previous_status: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_evse(mut self, evse_id: u32) -> Self {
        self.evse_id = Some(evse_id);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_status_change(
        mut self,
        status: impl Into<String>,
        previous: Option<String>,
    ) -> Self {
        self.status = Some(status.into());
        self.previous_status = previous;
        self
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        for k in [
            EventKind::Boot,
            EventKind::Heartbeat,
            EventKind::StatusChange,
            EventKind::Disconnect,
            EventKind::ClockSkew,
            EventKind::StopWithoutSession,
        ] {
            assert_eq!(EventKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(EventKind::parse("reboot"), None);
    }

    #[test]
    fn builder_sets_fields() {
        let ev = DeviceEvent::new("CP-001", EventKind::StatusChange)
            .with_evse(1)
            .with_status_change("Charging", Some("Available".into()));
        assert_eq!(ev.evse_id, Some(1));
        assert_eq!(ev.status.as_deref(), Some("Charging"));
        assert_eq!(ev.previous_status.as_deref(), Some("Available"));
    }
}
