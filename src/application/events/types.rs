//! Event payload types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePointConnectedEvent {
    pub charge_point_id: String,
    pub transport: String,
    pub remote_addr: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargePointDisconnectedEvent {
    pub charge_point_id: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootNotificationEvent {
    pub charge_point_id: String,
    pub vendor: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub charge_point_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatusChangedEvent {
    pub charge_point_id: String,
    pub connector_id: u32,
    pub status: String,
    pub previous_status: Option<String>,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStartedEvent {
    pub charge_point_id: String,
    pub connector_id: u32,
    pub transaction_id: i32,
    pub id_tag: String,
    pub meter_start: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStoppedEvent {
    pub charge_point_id: String,
    pub transaction_id: i32,
    pub meter_stop: i32,
    pub energy_kwh: Decimal,
    pub total_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterValuesEvent {
    pub charge_point_id: String,
    pub connector_id: u32,
    pub transaction_id: Option<i32>,
    pub energy_wh: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandIssuedEvent {
    pub charge_point_id: String,
    pub action: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

/// All events published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    ChargePointConnected(ChargePointConnectedEvent),
    ChargePointDisconnected(ChargePointDisconnectedEvent),
    BootNotification(BootNotificationEvent),
    HeartbeatReceived(HeartbeatEvent),
    ConnectorStatusChanged(ConnectorStatusChangedEvent),
    TransactionStarted(TransactionStartedEvent),
    TransactionStopped(TransactionStoppedEvent),
    MeterValuesReceived(MeterValuesEvent),
    CommandIssued(CommandIssuedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ChargePointConnected(_) => "charge_point_connected",
            Self::ChargePointDisconnected(_) => "charge_point_disconnected",
            Self::BootNotification(_) => "boot_notification",
            Self::HeartbeatReceived(_) => "heartbeat",
            Self::ConnectorStatusChanged(_) => "connector_status_changed",
            Self::TransactionStarted(_) => "transaction_started",
            Self::TransactionStopped(_) => "transaction_stopped",
            Self::MeterValuesReceived(_) => "meter_values",
            Self::CommandIssued(_) => "command_issued",
        }
    }

    pub fn charge_point_id(&self) -> &str {
        match self {
            Self::ChargePointConnected(e) => &e.charge_point_id,
            Self::ChargePointDisconnected(e) => &e.charge_point_id,
            Self::BootNotification(e) => &e.charge_point_id,
            Self::HeartbeatReceived(e) => &e.charge_point_id,
            Self::ConnectorStatusChanged(e) => &e.charge_point_id,
            Self::TransactionStarted(e) => &e.charge_point_id,
            Self::TransactionStopped(e) => &e.charge_point_id,
            Self::MeterValuesReceived(e) => &e.charge_point_id,
            Self::CommandIssued(e) => &e.charge_point_id,
        }
    }
}

/// Envelope delivered to subscribers.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub event: Event,
    pub published_at: DateTime<Utc>,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            published_at: Utc::now(),
        }
    }
}
