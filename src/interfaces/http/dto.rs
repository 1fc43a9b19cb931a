//! Control plane DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::control::{
    ChargePointSnapshot, DailyStats, DeviceCredentials, StatusPeriod,
};
use crate::domain::charging_session::ChargingSession;
use crate::domain::device::Device;
use crate::domain::evse::Evse;
use crate::domain::order::Order;

// ── Charge points ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectorDto {
    pub connector_id: u32,
    pub connector_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_code: Option<String>,
}

impl ConnectorDto {
    pub fn from_domain(evse: Evse) -> Self {
        Self {
            connector_id: evse.connector_id,
            connector_type: evse.connector_type.as_str().to_string(),
            status: evse.status.as_str().to_string(),
            last_error_code: evse.last_error_code,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChargerDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    pub physical_status: String,
    pub operational_status: String,
    pub session_state: String,
    pub is_configured: bool,
    pub is_available: bool,
    pub active_sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub location: LocationDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_kwh: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging_rate_kw: Option<f64>,
    pub connectors: Vec<ConnectorDto>,
}

impl ChargerDto {
    pub fn from_snapshot(snapshot: ChargePointSnapshot) -> Self {
        let cp = snapshot.charge_point;
        Self {
            id: cp.id,
            vendor: cp.vendor,
            model: cp.model,
            firmware_version: cp.firmware_version,
            physical_status: cp.physical_status.as_str().to_string(),
            operational_status: cp.operational_status.as_str().to_string(),
            session_state: snapshot.session_state.as_str().to_string(),
            is_configured: snapshot.is_configured,
            is_available: snapshot.is_available,
            active_sessions: snapshot.active_sessions,
            last_seen: cp.last_seen,
            location: LocationDto {
                latitude: cp.location.latitude,
                longitude: cp.location.longitude,
                address: cp.location.address,
            },
            price_per_kwh: cp.price_per_kwh,
            charging_rate_kw: cp.charging_rate_kw,
            connectors: snapshot
                .evses
                .into_iter()
                .map(ConnectorDto::from_domain)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateChargerRequest {
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub address: Option<String>,
    /// COP per kWh
    pub price_per_kwh: Decimal,
    /// Nominal charging rate (kW)
    pub charging_rate: Option<f64>,
}

// ── Commands ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStartRequest {
    #[validate(length(min = 1, max = 100))]
    pub charge_point_id: String,
    #[validate(length(min = 1, max = 20))]
    pub id_tag: String,
    pub connector_id: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStopRequest {
    #[validate(length(min = 1, max = 100))]
    pub charge_point_id: String,
    /// Omit to stop the unique active transaction.
    pub transaction_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommandResponse {
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequestDto {
    /// "Soft" or "Hard"
    #[validate(length(min = 1))]
    pub kind: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAvailabilityRequestDto {
    pub connector_id: u32,
    /// "Operative" or "Inoperative"
    #[validate(length(min = 1))]
    pub kind: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMessageRequestDto {
    /// e.g. "Heartbeat", "StatusNotification"
    #[validate(length(min = 1))]
    pub requested_message: String,
    pub connector_id: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConnectorRequestDto {
    pub connector_id: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetDiagnosticsRequestDto {
    /// Upload URL the charger should push diagnostics to
    #[validate(length(min = 1))]
    pub location: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFirmwareRequestDto {
    #[validate(length(min = 1))]
    pub location: String,
    pub retrieve_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 100))]
    pub charge_point_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceRequest {
    #[validate(length(min = 1, max = 100))]
    pub charge_point_id: String,
    pub price_per_kwh: Decimal,
    pub charging_rate: Option<f64>,
}

// ── Transactions / orders ──────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionDto {
    pub transaction_id: i32,
    pub charge_point_id: String,
    pub connector_id: u32,
    pub id_tag: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub meter_start: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_stop: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_kwh: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl TransactionDto {
    pub fn from_domain(session: ChargingSession) -> Self {
        Self {
            transaction_id: session.transaction_id,
            connector_id: session.evse_id,
            status: session.status.as_str().to_string(),
            energy_kwh: session.energy_kwh(),
            duration_seconds: session.duration_seconds(),
            charge_point_id: session.charge_point_id,
            id_tag: session.id_tag,
            start_time: session.start_time,
            end_time: session.end_time,
            meter_start: session.meter_start,
            meter_stop: session.meter_stop,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDto {
    pub id: String,
    pub charge_point_id: String,
    pub id_tag: String,
    pub energy_kwh: Decimal,
    pub duration_minutes: Decimal,
    pub price_per_kwh: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl OrderDto {
    pub fn from_domain(order: Order) -> Self {
        Self {
            id: order.id,
            charge_point_id: order.charge_point_id,
            id_tag: order.id_tag,
            energy_kwh: order.energy_kwh,
            duration_minutes: order.duration_minutes,
            price_per_kwh: order.price_per_kwh,
            total_amount: order.total_amount,
            status: order.status.as_str().to_string(),
            created_at: order.created_at,
        }
    }
}

// ── Statistics ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyStatsDto {
    pub date: String,
    pub charging_sessions: usize,
    pub total_energy_kwh: Decimal,
    pub total_duration_minutes: Decimal,
    pub total_revenue: Decimal,
}

impl DailyStatsDto {
    pub fn from_domain(stats: DailyStats) -> Self {
        Self {
            date: stats.date.to_string(),
            charging_sessions: stats.charging_sessions,
            total_energy_kwh: stats.energy_kwh,
            total_duration_minutes: stats.duration_minutes.round_dp(2),
            total_revenue: stats.revenue,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusPeriodDto {
    pub status: String,
    pub from: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl StatusPeriodDto {
    pub fn from_domain(period: StatusPeriod) -> Self {
        Self {
            status: period.status,
            from: period.from,
            to: period.to,
        }
    }
}

// ── Devices ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    #[validate(length(min = 1, max = 100))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 50))]
    pub type_code: String,
    #[validate(length(min = 8))]
    pub master_secret: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCredentialsDto {
    pub serial_number: String,
    pub client_id: String,
    pub username: String,
    /// Derived device password; shown exactly once.
    pub password: String,
    pub up_topic: String,
    pub down_topic: String,
}

impl DeviceCredentialsDto {
    pub fn from_domain(creds: DeviceCredentials) -> Self {
        Self {
            serial_number: creds.serial_number,
            client_id: creds.client_id,
            username: creds.username,
            password: creds.password,
            up_topic: creds.up_topic,
            down_topic: creds.down_topic,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub serial_number: String,
    pub type_code: String,
    pub mqtt_client_id: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<DateTime<Utc>>,
}

impl DeviceDto {
    pub fn from_domain(device: Device) -> Self {
        Self {
            mqtt_client_id: device.client_id(),
            serial_number: device.serial_number,
            type_code: device.type_code,
            is_active: device.is_active,
            last_connected: device.last_connected,
        }
    }
}
