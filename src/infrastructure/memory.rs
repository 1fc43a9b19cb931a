//! In-memory repository provider.
//!
//! Implements every repository trait over `tokio::sync::RwLock`-guarded maps.
//! Used by unit and scenario tests so the full session engine can run without
//! a database; mirrors the SeaORM implementations' semantics, including the
//! one-active-session check inside `start`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::charge_point::{ChargePoint, ConnectorStatus, Location, OperationalStatus};
use crate::domain::charging_session::{ChargingSession, SessionStatus};
use crate::domain::device::Device;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::evse::Evse;
use crate::domain::id_tag::IdTag;
use crate::domain::meter_value::MeterSample;
use crate::domain::order::Order;
use crate::domain::repositories::{
    ChargePointRepository, ChargingSessionRepository, DeviceEventRepository, DeviceRepository,
    EvseRepository, IdTagRepository, MeterValueRepository, OrderRepository, RepositoryProvider,
};
use crate::support::errors::{DomainError, DomainResult};

#[derive(Default)]
struct Tables {
    devices: RwLock<HashMap<String, Device>>,
    charge_points: RwLock<HashMap<String, ChargePoint>>,
    evses: RwLock<Vec<Evse>>,
    sessions: RwLock<Vec<ChargingSession>>,
    meter_values: RwLock<Vec<MeterSample>>,
    device_events: RwLock<Vec<DeviceEvent>>,
    id_tags: RwLock<HashMap<String, IdTag>>,
    orders: RwLock<Vec<Order>>,
}

/// All repositories over shared in-memory tables.
pub struct InMemoryRepositoryProvider {
    tables: Arc<Tables>,
    next_evse_id: AtomicI32,
    next_session_id: AtomicI32,
    next_event_id: AtomicI32,
    next_sample_id: AtomicI32,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            next_evse_id: AtomicI32::new(1),
            next_session_id: AtomicI32::new(1),
            next_event_id: AtomicI32::new(1),
            next_sample_id: AtomicI32::new(1),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn devices(&self) -> &dyn DeviceRepository {
        self
    }
    fn charge_points(&self) -> &dyn ChargePointRepository {
        self
    }
    fn evses(&self) -> &dyn EvseRepository {
        self
    }
    fn sessions(&self) -> &dyn ChargingSessionRepository {
        self
    }
    fn meter_values(&self) -> &dyn MeterValueRepository {
        self
    }
    fn device_events(&self) -> &dyn DeviceEventRepository {
        self
    }
    fn id_tags(&self) -> &dyn IdTagRepository {
        self
    }
    fn orders(&self) -> &dyn OrderRepository {
        self
    }
}

#[async_trait]
impl DeviceRepository for InMemoryRepositoryProvider {
    async fn save(&self, device: Device) -> DomainResult<()> {
        self.tables
            .devices
            .write()
            .await
            .insert(device.serial_number.clone(), device);
        Ok(())
    }

    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Device>> {
        Ok(self.tables.devices.read().await.get(serial).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<Device>> {
        Ok(self.tables.devices.read().await.values().cloned().collect())
    }

    async fn update_last_connected(&self, serial: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let mut devices = self.tables.devices.write().await;
        let device = devices.get_mut(serial).ok_or(DomainError::NotFound {
            entity: "Device",
            field: "serial_number",
            value: serial.to_string(),
        })?;
        device.last_connected = Some(at);
        Ok(())
    }
}

#[async_trait]
impl ChargePointRepository for InMemoryRepositoryProvider {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        if cps.contains_key(&charge_point.id) {
            return Err(DomainError::Conflict(format!(
                "charge point {} already exists",
                charge_point.id
            )));
        }
        cps.insert(charge_point.id.clone(), charge_point);
        Ok(())
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        if !cps.contains_key(&charge_point.id) {
            return Err(DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: charge_point.id.clone(),
            });
        }
        cps.insert(charge_point.id.clone(), charge_point);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>> {
        Ok(self.tables.charge_points.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        let mut all: Vec<ChargePoint> = self
            .tables
            .charge_points
            .read()
            .await
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn update_physical_status(&self, id: &str, status: ConnectorStatus) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        let cp = cps.get_mut(id).ok_or(DomainError::NotFound {
            entity: "ChargePoint",
            field: "id",
            value: id.to_string(),
        })?;
        cp.physical_status = status;
        Ok(())
    }

    async fn update_operational_status(
        &self,
        id: &str,
        status: OperationalStatus,
    ) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        let cp = cps.get_mut(id).ok_or(DomainError::NotFound {
            entity: "ChargePoint",
            field: "id",
            value: id.to_string(),
        })?;
        cp.operational_status = status;
        Ok(())
    }

    async fn update_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        if let Some(cp) = cps.get_mut(id) {
            cp.last_seen = Some(at);
        }
        Ok(())
    }

    async fn update_location(&self, id: &str, location: Location) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        let cp = cps.get_mut(id).ok_or(DomainError::NotFound {
            entity: "ChargePoint",
            field: "id",
            value: id.to_string(),
        })?;
        cp.location = location;
        Ok(())
    }

    async fn update_pricing(
        &self,
        id: &str,
        price_per_kwh: Decimal,
        charging_rate_kw: Option<f64>,
    ) -> DomainResult<()> {
        let mut cps = self.tables.charge_points.write().await;
        let cp = cps.get_mut(id).ok_or(DomainError::NotFound {
            entity: "ChargePoint",
            field: "id",
            value: id.to_string(),
        })?;
        cp.price_per_kwh = Some(price_per_kwh);
        if charging_rate_kw.is_some() {
            cp.charging_rate_kw = charging_rate_kw;
        }
        Ok(())
    }
}

#[async_trait]
impl EvseRepository for InMemoryRepositoryProvider {
    async fn upsert_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: ConnectorStatus,
        error_code: Option<String>,
    ) -> DomainResult<Evse> {
        let mut evses = self.tables.evses.write().await;
        if let Some(evse) = evses
            .iter_mut()
            .find(|e| e.charge_point_id == charge_point_id && e.connector_id == connector_id)
        {
            evse.status = status;
            evse.last_error_code = error_code;
            evse.updated_at = Utc::now();
            return Ok(evse.clone());
        }

        let mut evse = Evse::new(charge_point_id, connector_id);
        evse.id = self.next_evse_id.fetch_add(1, Ordering::SeqCst);
        evse.status = status;
        evse.last_error_code = error_code;
        evses.push(evse.clone());
        Ok(evse)
    }

    async fn find(&self, charge_point_id: &str, connector_id: u32) -> DomainResult<Option<Evse>> {
        Ok(self
            .tables
            .evses
            .read()
            .await
            .iter()
            .find(|e| e.charge_point_id == charge_point_id && e.connector_id == connector_id)
            .cloned())
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>> {
        let mut found: Vec<Evse> = self
            .tables
            .evses
            .read()
            .await
            .iter()
            .filter(|e| e.charge_point_id == charge_point_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.connector_id);
        Ok(found)
    }
}

#[async_trait]
impl ChargingSessionRepository for InMemoryRepositoryProvider {
    async fn next_transaction_id(&self) -> DomainResult<i32> {
        let sessions = self.tables.sessions.read().await;
        Ok(sessions.iter().map(|s| s.transaction_id).max().unwrap_or(0) + 1)
    }

    async fn start(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        let mut sessions = self.tables.sessions.write().await;

        let busy = sessions.iter().any(|s| {
            s.charge_point_id == session.charge_point_id
                && s.evse_id == session.evse_id
                && s.is_active()
        });
        if busy {
            return Err(DomainError::Conflict(format!(
                "connector {}/{} already has an active session",
                session.charge_point_id, session.evse_id
            )));
        }

        if session.transaction_id <= 0 {
            session.transaction_id =
                sessions.iter().map(|s| s.transaction_id).max().unwrap_or(0) + 1;
        }
        session.id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        sessions.push(session.clone());
        Ok(session)
    }

    async fn complete(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
        reason: Option<String>,
    ) -> DomainResult<Option<ChargingSession>> {
        let mut sessions = self.tables.sessions.write().await;
        let session = sessions.iter_mut().find(|s| {
            s.charge_point_id == charge_point_id
                && s.transaction_id == transaction_id
                && s.is_active()
        });

        match session {
            Some(session) => {
                session.complete(end_time, meter_stop, reason);
                Ok(Some(session.clone()))
            }
            None => Ok(None),
        }
    }

    async fn force_close(
        &self,
        session_id: i32,
        status: SessionStatus,
        end_time: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut sessions = self.tables.sessions.write().await;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(DomainError::NotFound {
                entity: "ChargingSession",
                field: "id",
                value: session_id.to_string(),
            })?;
        session.status = status;
        session.end_time = Some(end_time.max(session.start_time));
        Ok(())
    }

    async fn find_by_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .tables
            .sessions
            .read()
            .await
            .iter()
            .find(|s| s.charge_point_id == charge_point_id && s.transaction_id == transaction_id)
            .cloned())
    }

    async fn find_active(
        &self,
        charge_point_id: &str,
        evse_id: u32,
    ) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .tables
            .sessions
            .read()
            .await
            .iter()
            .find(|s| {
                s.charge_point_id == charge_point_id && s.evse_id == evse_id && s.is_active()
            })
            .cloned())
    }

    async fn find_active_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(self
            .tables
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.charge_point_id == charge_point_id && s.is_active())
            .cloned()
            .collect())
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        let mut found: Vec<ChargingSession> = self
            .tables
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.charge_point_id == charge_point_id && s.start_time >= since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(found)
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<ChargingSession>> {
        let mut all: Vec<ChargingSession> =
            self.tables.sessions.read().await.iter().cloned().collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn find_active_started_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(self
            .tables
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.is_active() && s.start_time < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MeterValueRepository for InMemoryRepositoryProvider {
    async fn append(&self, mut sample: MeterSample) -> DomainResult<()> {
        sample.id = self.next_sample_id.fetch_add(1, Ordering::SeqCst);
        self.tables.meter_values.write().await.push(sample);
        Ok(())
    }

    async fn latest_timestamp(&self, session_id: i32) -> DomainResult<Option<DateTime<Utc>>> {
        Ok(self
            .tables
            .meter_values
            .read()
            .await
            .iter()
            .filter(|m| m.session_id == session_id)
            .map(|m| m.timestamp)
            .max())
    }

    async fn find_for_session(&self, session_id: i32) -> DomainResult<Vec<MeterSample>> {
        let mut found: Vec<MeterSample> = self
            .tables
            .meter_values
            .read()
            .await
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.timestamp);
        Ok(found)
    }
}

#[async_trait]
impl DeviceEventRepository for InMemoryRepositoryProvider {
    async fn append(&self, mut event: DeviceEvent) -> DomainResult<()> {
        event.id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.tables.device_events.write().await.push(event);
        Ok(())
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
        kind: Option<EventKind>,
    ) -> DomainResult<Vec<DeviceEvent>> {
        let mut found: Vec<DeviceEvent> = self
            .tables
            .device_events
            .read()
            .await
            .iter()
            .filter(|e| {
                e.charge_point_id == charge_point_id
                    && e.timestamp >= since
                    && kind.map_or(true, |k| e.kind == k)
            })
            .cloned()
            .collect();
        found.sort_by_key(|e| e.timestamp);
        Ok(found)
    }

    async fn latest_per_charge_point(&self) -> DomainResult<Vec<DeviceEvent>> {
        let events = self.tables.device_events.read().await;
        let mut latest: HashMap<String, DeviceEvent> = HashMap::new();
        for event in events.iter() {
            match latest.get(&event.charge_point_id) {
                Some(existing) if existing.timestamp >= event.timestamp => {}
                _ => {
                    latest.insert(event.charge_point_id.clone(), event.clone());
                }
            }
        }
        Ok(latest.into_values().collect())
    }
}

#[async_trait]
impl IdTagRepository for InMemoryRepositoryProvider {
    async fn save(&self, tag: IdTag) -> DomainResult<()> {
        self.tables
            .id_tags
            .write()
            .await
            .insert(tag.tag.clone(), tag);
        Ok(())
    }

    async fn find(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        Ok(self.tables.id_tags.read().await.get(tag).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<IdTag>> {
        let mut all: Vec<IdTag> = self.tables.id_tags.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(all)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepositoryProvider {
    async fn save(&self, order: Order) -> DomainResult<()> {
        self.tables.orders.write().await.push(order);
        Ok(())
    }

    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Order>> {
        Ok(self
            .tables
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.session_id == session_id)
            .cloned())
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Order>> {
        let mut found: Vec<Order> = self
            .tables
            .orders
            .read()
            .await
            .iter()
            .filter(|o| o.charge_point_id == charge_point_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<Order>> {
        let mut all: Vec<Order> = self.tables.orders.read().await.iter().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_rejects_second_active_session_on_connector() {
        let repos = InMemoryRepositoryProvider::new();
        let s1 = ChargingSession::new("CP-001", 1, 0, "T1", 1000, Utc::now());
        let started = repos.start(s1).await.unwrap();
        assert_eq!(started.transaction_id, 1);

        let s2 = ChargingSession::new("CP-001", 1, 0, "T2", 1100, Utc::now());
        let err = repos.start(s2).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn transaction_ids_are_monotonic() {
        let repos = InMemoryRepositoryProvider::new();
        let a = repos
            .start(ChargingSession::new("CP-001", 1, 0, "T1", 0, Utc::now()))
            .await
            .unwrap();
        let b = repos
            .start(ChargingSession::new("CP-001", 2, 0, "T1", 0, Utc::now()))
            .await
            .unwrap();
        assert!(b.transaction_id > a.transaction_id);
    }

    #[tokio::test]
    async fn complete_is_conditional_on_active() {
        let repos = InMemoryRepositoryProvider::new();
        let started = repos
            .start(ChargingSession::new("CP-001", 1, 0, "T1", 1000, Utc::now()))
            .await
            .unwrap();

        let closed = repos
            .complete("CP-001", started.transaction_id, Utc::now(), 1500, None)
            .await
            .unwrap();
        assert!(closed.is_some());

        // Second stop finds nothing to close
        let again = repos
            .complete("CP-001", started.transaction_id, Utc::now(), 1500, None)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn latest_timestamp_tracks_max() {
        let repos = InMemoryRepositoryProvider::new();
        let t0 = Utc::now();
        repos
            .meter_values()
            .append(MeterSample::new(1, t0, 100))
            .await
            .unwrap();
        repos
            .meter_values()
            .append(MeterSample::new(1, t0 + chrono::Duration::seconds(30), 200))
            .await
            .unwrap();
        let latest = repos.meter_values().latest_timestamp(1).await.unwrap().unwrap();
        assert_eq!(latest, t0 + chrono::Duration::seconds(30));
        assert!(repos
            .meter_values()
            .latest_timestamp(2)
            .await
            .unwrap()
            .is_none());
    }
}
