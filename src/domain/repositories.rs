//! Repository traits — the persistence seam.
//!
//! One trait per aggregate, collected behind `RepositoryProvider`. SeaORM
//! implementations live in `infrastructure::database`; an in-memory variant
//! used by tests lives in `infrastructure::memory`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::charge_point::{ChargePoint, ConnectorStatus, Location, OperationalStatus};
use super::charging_session::ChargingSession;
use super::device::Device;
use super::device_event::{DeviceEvent, EventKind};
use super::evse::Evse;
use super::id_tag::IdTag;
use super::meter_value::MeterSample;
use super::order::Order;
use crate::support::errors::DomainResult;

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn save(&self, device: Device) -> DomainResult<()>;
    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Device>>;
    async fn find_all(&self) -> DomainResult<Vec<Device>>;
    async fn update_last_connected(&self, serial: &str, at: DateTime<Utc>) -> DomainResult<()>;
}

#[async_trait]
pub trait ChargePointRepository: Send + Sync {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>>;
    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>>;
    async fn update_physical_status(&self, id: &str, status: ConnectorStatus) -> DomainResult<()>;
    async fn update_operational_status(
        &self,
        id: &str,
        status: OperationalStatus,
    ) -> DomainResult<()>;
    async fn update_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;
    async fn update_location(&self, id: &str, location: Location) -> DomainResult<()>;
    async fn update_pricing(
        &self,
        id: &str,
        price_per_kwh: Decimal,
        charging_rate_kw: Option<f64>,
    ) -> DomainResult<()>;
}

#[async_trait]
pub trait EvseRepository: Send + Sync {
    /// Insert-or-update the connector row, keyed by
    /// `(charge_point_id, connector_id)`.
    async fn upsert_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: ConnectorStatus,
        error_code: Option<String>,
    ) -> DomainResult<Evse>;
    async fn find(&self, charge_point_id: &str, connector_id: u32) -> DomainResult<Option<Evse>>;
    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>>;
}

#[async_trait]
pub trait ChargingSessionRepository: Send + Sync {
    /// Next server-assigned transaction id (monotonically increasing).
    async fn next_transaction_id(&self) -> DomainResult<i32>;

    /// Create a new active session. Runs the uniqueness check and the insert
    /// in one store transaction; fails with `Conflict` when the connector
    /// already has an active session.
    async fn start(&self, session: ChargingSession) -> DomainResult<ChargingSession>;

    /// Conditionally close the active session with this transaction id.
    /// Returns the closed session, or `None` when no matching active session
    /// exists (double stop, replay).
    async fn complete(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
        reason: Option<String>,
    ) -> DomainResult<Option<ChargingSession>>;

    /// Force-close a session with the given status (interrupted/cancelled).
    async fn force_close(
        &self,
        session_id: i32,
        status: super::charging_session::SessionStatus,
        end_time: DateTime<Utc>,
    ) -> DomainResult<()>;

    async fn find_by_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn find_active(
        &self,
        charge_point_id: &str,
        evse_id: u32,
    ) -> DomainResult<Option<ChargingSession>>;
    async fn find_active_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>>;
    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>>;
    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<ChargingSession>>;
    /// Active sessions that started before `cutoff` (stale-session sweep).
    async fn find_active_started_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>>;
}

#[async_trait]
pub trait MeterValueRepository: Send + Sync {
    async fn append(&self, sample: MeterSample) -> DomainResult<()>;
    /// Latest stored timestamp for a session, for the monotonicity clamp.
    async fn latest_timestamp(&self, session_id: i32) -> DomainResult<Option<DateTime<Utc>>>;
    async fn find_for_session(&self, session_id: i32) -> DomainResult<Vec<MeterSample>>;
}

#[async_trait]
pub trait DeviceEventRepository: Send + Sync {
    async fn append(&self, event: DeviceEvent) -> DomainResult<()>;
    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
        kind: Option<EventKind>,
    ) -> DomainResult<Vec<DeviceEvent>>;
    /// Latest event per charge point — used to rebuild the liveness cache
    /// after a cold start.
    async fn latest_per_charge_point(&self) -> DomainResult<Vec<DeviceEvent>>;
}

#[async_trait]
pub trait IdTagRepository: Send + Sync {
    async fn save(&self, tag: IdTag) -> DomainResult<()>;
    async fn find(&self, tag: &str) -> DomainResult<Option<IdTag>>;
    async fn find_all(&self) -> DomainResult<Vec<IdTag>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> DomainResult<()>;
    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Order>>;
    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Order>>;
    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<Order>>;
}

/// Unified accessor for all repositories.
pub trait RepositoryProvider: Send + Sync {
    fn devices(&self) -> &dyn DeviceRepository;
    fn charge_points(&self) -> &dyn ChargePointRepository;
    fn evses(&self) -> &dyn EvseRepository;
    fn sessions(&self) -> &dyn ChargingSessionRepository;
    fn meter_values(&self) -> &dyn MeterValueRepository;
    fn device_events(&self) -> &dyn DeviceEventRepository;
    fn id_tags(&self) -> &dyn IdTagRepository;
    fn orders(&self) -> &dyn OrderRepository;
}

/// Shared, reference-counted provider.
pub type SharedRepositoryProvider = Arc<dyn RepositoryProvider>;
