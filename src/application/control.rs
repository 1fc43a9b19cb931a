//! Control API — the internal surface consumed by the REST plane.
//!
//! Read paths are store snapshots (never in-memory session state); OCPP-
//! issuing operations go through the command sender and are rejected with
//! `ChargerOffline` unless the session is Online.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::application::commands::{
    self, Availability, CommandError, ResetKind, SharedCommandSender, TriggerType,
};
use crate::application::services::ChargingService;
use crate::application::session::{SessionState, SharedSessionRegistry};
use crate::domain::charge_point::{ChargePoint, Location};
use crate::domain::charging_session::ChargingSession;
use crate::domain::device::Device;
use crate::domain::device_event::EventKind;
use crate::domain::evse::Evse;
use crate::domain::order::Order;
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::infrastructure::crypto::derive_password;
use crate::support::errors::{DomainError, DomainResult};

/// A charge point read model with its derived flags.
#[derive(Debug, Clone)]
pub struct ChargePointSnapshot {
    pub charge_point: ChargePoint,
    pub evses: Vec<Evse>,
    pub session_state: SessionState,
    pub active_sessions: usize,
    pub is_configured: bool,
    pub is_available: bool,
}

/// One day of usage statistics.
#[derive(Debug, Clone)]
pub struct DailyStats {
    pub date: chrono::NaiveDate,
    pub charging_sessions: usize,
    pub energy_kwh: Decimal,
    pub duration_minutes: Decimal,
    pub revenue: Decimal,
}

/// One contiguous period a charge point spent in a status.
#[derive(Debug, Clone)]
pub struct StatusPeriod {
    pub status: String,
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

/// Credentials handed to the operator when a device is provisioned.
#[derive(Debug, Clone)]
pub struct DeviceCredentials {
    pub serial_number: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub up_topic: String,
    pub down_topic: String,
}

pub struct ControlApi {
    repos: SharedRepositoryProvider,
    registry: SharedSessionRegistry,
    commands: SharedCommandSender,
    charging: Arc<ChargingService>,
}

fn command_err(charge_point_id: &str, e: CommandError) -> DomainError {
    match e {
        CommandError::NotConnected(id) => DomainError::ChargerOffline(id),
        CommandError::Busy(id) => DomainError::ChargerBusy(id),
        CommandError::Timeout => DomainError::CommandTimeout(charge_point_id.to_string()),
        CommandError::Disconnected(id) => DomainError::ChargerDisconnected(id),
        CommandError::SendFailed(msg) | CommandError::InvalidResponse(msg) => {
            DomainError::Validation(msg)
        }
        CommandError::CallError { code, description } => {
            DomainError::Validation(format!("charger rejected command: {} {}", code, description))
        }
    }
}

impl ControlApi {
    pub fn new(
        repos: SharedRepositoryProvider,
        registry: SharedSessionRegistry,
        commands: SharedCommandSender,
        charging: Arc<ChargingService>,
    ) -> Self {
        Self {
            repos,
            registry,
            commands,
            charging,
        }
    }

    fn require_online(&self, charge_point_id: &str) -> DomainResult<()> {
        if self.registry.is_online(charge_point_id) {
            Ok(())
        } else {
            Err(DomainError::ChargerOffline(charge_point_id.to_string()))
        }
    }

    async fn snapshot(&self, charge_point: ChargePoint) -> DomainResult<ChargePointSnapshot> {
        let evses = self
            .repos
            .evses()
            .find_for_charge_point(&charge_point.id)
            .await?;
        let active = self
            .repos
            .sessions()
            .find_active_for_charge_point(&charge_point.id)
            .await?;
        let session_state = self
            .registry
            .state(&charge_point.id)
            .unwrap_or(SessionState::Disconnected);
        Ok(ChargePointSnapshot {
            is_configured: charge_point.is_configured(),
            is_available: charge_point.is_available(),
            active_sessions: active.len(),
            session_state,
            evses,
            charge_point,
        })
    }

    // ── Read views ─────────────────────────────────────────

    pub async fn list_charge_points(&self) -> DomainResult<Vec<ChargePointSnapshot>> {
        let mut snapshots = Vec::new();
        for cp in self.repos.charge_points().find_all().await? {
            snapshots.push(self.snapshot(cp).await?);
        }
        Ok(snapshots)
    }

    /// Chargers that have connected but are missing location or pricing —
    /// the operator onboarding queue.
    pub async fn list_pending_chargers(&self) -> DomainResult<Vec<ChargePointSnapshot>> {
        let all = self.list_charge_points().await?;
        Ok(all.into_iter().filter(|s| !s.is_configured).collect())
    }

    pub async fn get_charge_point(&self, id: &str) -> DomainResult<ChargePointSnapshot> {
        let cp = self
            .repos
            .charge_points()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: id.to_string(),
            })?;
        self.snapshot(cp).await
    }

    /// Daily usage aggregates over the last `days` days.
    pub async fn get_history(&self, id: &str, days: u32) -> DomainResult<Vec<DailyStats>> {
        self.get_charge_point(id).await?;
        let days = days.clamp(1, 30);
        let since = Utc::now() - Duration::days(days as i64);

        let sessions = self.repos.sessions().find_for_charge_point(id, since).await?;
        let orders = self.repos.orders().find_for_charge_point(id).await?;

        let mut by_day: std::collections::BTreeMap<chrono::NaiveDate, DailyStats> =
            std::collections::BTreeMap::new();
        for offset in 0..days {
            let date = (Utc::now() - Duration::days(offset as i64)).date_naive();
            by_day.insert(
                date,
                DailyStats {
                    date,
                    charging_sessions: 0,
                    energy_kwh: Decimal::ZERO,
                    duration_minutes: Decimal::ZERO,
                    revenue: Decimal::ZERO,
                },
            );
        }

        for session in sessions.iter().filter(|s| !s.is_active()) {
            let date = session.start_time.date_naive();
            let Some(stats) = by_day.get_mut(&date) else {
                continue;
            };
            stats.charging_sessions += 1;
            if let Some(kwh) = session.energy_kwh() {
                stats.energy_kwh += kwh;
            }
            if let Some(secs) = session.duration_seconds() {
                stats.duration_minutes += Decimal::from(secs) / Decimal::from(60);
            }
            if let Some(order) = orders.iter().find(|o| o.session_id == session.id) {
                stats.revenue += order.total_amount;
            }
        }

        Ok(by_day.into_values().collect())
    }

    /// Raw heartbeat timestamps within the window.
    pub async fn get_heartbeat_timeline(
        &self,
        id: &str,
        window_hours: u32,
    ) -> DomainResult<Vec<DateTime<Utc>>> {
        self.get_charge_point(id).await?;
        let since = Utc::now() - Duration::hours(window_hours.clamp(1, 24 * 30) as i64);
        let events = self
            .repos
            .device_events()
            .find_for_charge_point(id, since, Some(EventKind::Heartbeat))
            .await?;
        Ok(events.into_iter().map(|e| e.timestamp).collect())
    }

    /// Status periods derived from the status-change audit trail.
    pub async fn get_status_timeline(
        &self,
        id: &str,
        window_hours: u32,
    ) -> DomainResult<Vec<StatusPeriod>> {
        self.get_charge_point(id).await?;
        let since = Utc::now() - Duration::hours(window_hours.clamp(1, 24 * 30) as i64);
        let events = self
            .repos
            .device_events()
            .find_for_charge_point(id, since, Some(EventKind::StatusChange))
            .await?;

        let mut periods: Vec<StatusPeriod> = Vec::new();
        for event in events {
            let Some(status) = event.status else { continue };
            if let Some(last) = periods.last_mut() {
                if last.status == status {
                    continue;
                }
                last.to = Some(event.timestamp);
            }
            periods.push(StatusPeriod {
                status,
                from: event.timestamp,
                to: None,
            });
        }
        Ok(periods)
    }

    pub async fn list_transactions(&self, limit: u64) -> DomainResult<Vec<ChargingSession>> {
        self.repos.sessions().find_recent(limit).await
    }

    pub async fn list_orders(&self, limit: u64) -> DomainResult<Vec<Order>> {
        self.repos.orders().find_recent(limit).await
    }

    // ── OCPP-issuing operations ────────────────────────────

    pub async fn remote_start(
        &self,
        id: &str,
        id_tag: &str,
        connector_id: Option<u32>,
    ) -> DomainResult<String> {
        self.require_online(id)?;
        commands::remote_start_transaction(&self.commands, id, id_tag, connector_id.or(Some(1)))
            .await
            .map_err(|e| command_err(id, e))
    }

    /// Remote stop; resolves the unique active transaction when none given.
    pub async fn remote_stop(
        &self,
        id: &str,
        transaction_id: Option<i32>,
    ) -> DomainResult<String> {
        self.require_online(id)?;
        let transaction_id = match transaction_id {
            Some(tx) => tx,
            None => self.charging.sole_active_transaction(id).await?,
        };
        commands::remote_stop_transaction(&self.commands, id, transaction_id)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn change_availability(
        &self,
        id: &str,
        connector_id: u32,
        availability: Availability,
    ) -> DomainResult<String> {
        self.require_online(id)?;
        commands::change_availability(&self.commands, id, connector_id, availability)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn reset(&self, id: &str, kind: ResetKind) -> DomainResult<String> {
        self.require_online(id)?;
        commands::reset(&self.commands, id, kind)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn trigger_message(
        &self,
        id: &str,
        requested: TriggerType,
        connector_id: Option<u32>,
    ) -> DomainResult<String> {
        self.require_online(id)?;
        commands::trigger_message(&self.commands, id, requested, connector_id)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn unlock_connector(&self, id: &str, connector_id: u32) -> DomainResult<String> {
        self.require_online(id)?;
        commands::unlock_connector(&self.commands, id, connector_id)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn get_diagnostics(&self, id: &str, location: &str) -> DomainResult<Option<String>> {
        self.require_online(id)?;
        commands::get_diagnostics(&self.commands, id, location)
            .await
            .map_err(|e| command_err(id, e))
    }

    pub async fn update_firmware(
        &self,
        id: &str,
        location: &str,
        retrieve_date: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.require_online(id)?;
        commands::update_firmware(&self.commands, id, location, retrieve_date)
            .await
            .map_err(|e| command_err(id, e))
    }

    // ── Local (non-OCPP) operations ────────────────────────

    /// Operator pre-provisioning: create a charge point with location and
    /// pricing already configured.
    pub async fn create_charge_point(
        &self,
        id: &str,
        location: Location,
        price_per_kwh: Decimal,
        charging_rate_kw: Option<f64>,
    ) -> DomainResult<ChargePointSnapshot> {
        if self.repos.charge_points().find_by_id(id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "charge point {} already exists",
                id
            )));
        }
        let mut cp = ChargePoint::new(id);
        cp.location = location;
        cp.price_per_kwh = Some(price_per_kwh);
        cp.charging_rate_kw = charging_rate_kw;
        self.repos.charge_points().save(cp.clone()).await?;
        info!(charge_point_id = id, "Charge point created by operator");
        self.snapshot(cp).await
    }

    pub async fn update_location(&self, id: &str, location: Location) -> DomainResult<()> {
        self.repos.charge_points().update_location(id, location).await
    }

    pub async fn update_pricing(
        &self,
        id: &str,
        price_per_kwh: Decimal,
        charging_rate_kw: Option<f64>,
    ) -> DomainResult<()> {
        if price_per_kwh < Decimal::ZERO {
            return Err(DomainError::Validation(
                "price per kWh must not be negative".into(),
            ));
        }
        self.repos
            .charge_points()
            .update_pricing(id, price_per_kwh, charging_rate_kw)
            .await
    }

    // ── Device provisioning ────────────────────────────────

    /// Provision a device and hand back its derived MQTT credentials.
    ///
    /// `master_secret` is stored as provided (sealing is the provisioning
    /// pipeline's job); the derived password is returned exactly once.
    pub async fn create_device(
        &self,
        serial_number: &str,
        type_code: &str,
        master_secret: &str,
    ) -> DomainResult<DeviceCredentials> {
        if self
            .repos
            .devices()
            .find_by_serial(serial_number)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "device {} already exists",
                serial_number
            )));
        }

        let device = Device::new(serial_number, type_code, master_secret);
        let credentials = DeviceCredentials {
            serial_number: device.serial_number.clone(),
            client_id: device.client_id(),
            username: device.username().to_string(),
            password: derive_password(master_secret, serial_number),
            up_topic: device.up_topic(),
            down_topic: device.down_topic(),
        };
        self.repos.devices().save(device).await?;
        info!(serial_number, type_code, "Device provisioned");
        Ok(credentials)
    }

    pub async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        self.repos.devices().find_all().await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;
    use crate::application::session::SessionRegistry;
    use crate::application::CommandSender;
    use crate::infrastructure::cache::LivenessCache;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use std::time::Duration as StdDuration;

    fn control() -> (ControlApi, SharedSessionRegistry, SharedRepositoryProvider) {
        let repos: SharedRepositoryProvider = InMemoryRepositoryProvider::shared();
        let registry = SessionRegistry::shared(16);
        let commands = Arc::new(CommandSender::new(
            registry.clone(),
            Arc::new(LivenessCache::new(300)),
            create_event_bus(),
            StdDuration::from_secs(30),
            64,
        ));
        let charging = Arc::new(ChargingService::new(repos.clone()));
        (
            ControlApi::new(repos.clone(), registry.clone(), commands, charging),
            registry,
            repos,
        )
    }

    #[tokio::test]
    async fn remote_start_offline_is_rejected_without_sending() {
        let (api, _registry, _repos) = control();
        let err = api.remote_start("CP-002", "T1", None).await.unwrap_err();
        assert!(matches!(err, DomainError::ChargerOffline(_)));
    }

    #[tokio::test]
    async fn remote_stop_without_transaction_requires_exactly_one_active() {
        let (api, registry, repos) = control();
        let (sink, _rx) = tokio::sync::mpsc::unbounded_channel();
        registry.attach("CP-001", crate::application::TransportKind::WebSocket, sink);
        registry.set_state("CP-001", SessionState::Online);

        let err = api.remote_stop("CP-001", None).await.unwrap_err();
        assert!(matches!(err, DomainError::NoActiveSession(_)));

        // Two active sessions on different connectors → ambiguous
        repos
            .sessions()
            .start(crate::domain::ChargingSession::new(
                "CP-001", 1, 0, "T1", 0, Utc::now(),
            ))
            .await
            .unwrap();
        repos
            .sessions()
            .start(crate::domain::ChargingSession::new(
                "CP-001", 2, 0, "T2", 0, Utc::now(),
            ))
            .await
            .unwrap();
        let err = api.remote_stop("CP-001", None).await.unwrap_err();
        assert!(matches!(err, DomainError::AmbiguousSession(_)));
    }

    #[tokio::test]
    async fn pending_chargers_lack_location_or_pricing() {
        let (api, _registry, _repos) = control();
        api.create_charge_point(
            "CP-CONFIGURED",
            Location {
                latitude: Some(4.7),
                longitude: Some(-74.0),
                address: None,
            },
            Decimal::new(270000, 2),
            Some(7.0),
        )
        .await
        .unwrap();

        // A charger provisioned by boot has neither location nor pricing
        _repos
            .charge_points()
            .save(ChargePoint::new("CP-BOOTED"))
            .await
            .unwrap();

        let pending = api.list_pending_chargers().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].charge_point.id, "CP-BOOTED");
    }

    #[tokio::test]
    async fn create_device_returns_derived_credentials() {
        let (api, _registry, _repos) = control();
        let creds = api
            .create_device("861076087029615", "zcf", "master-secret")
            .await
            .unwrap();
        assert_eq!(creds.client_id, "zcf&861076087029615");
        assert_eq!(creds.username, "861076087029615");
        assert_eq!(creds.password.len(), 12);
        assert_eq!(creds.up_topic, "zcf/861076087029615/user/up");

        let err = api
            .create_device("861076087029615", "zcf", "master-secret")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn status_timeline_collapses_consecutive_periods() {
        let (api, _registry, repos) = control();
        repos
            .charge_points()
            .save(ChargePoint::new("CP-001"))
            .await
            .unwrap();
        for status in ["Available", "Charging", "Charging", "Available"] {
            repos
                .device_events()
                .append(
                    crate::domain::DeviceEvent::new("CP-001", EventKind::StatusChange)
                        .with_status_change(status, None),
                )
                .await
                .unwrap();
        }

        let timeline = api.get_status_timeline("CP-001", 24).await.unwrap();
        let statuses: Vec<&str> = timeline.iter().map(|p| p.status.as_str()).collect();
        assert_eq!(statuses, vec!["Available", "Charging", "Available"]);
        assert!(timeline[0].to.is_some());
        assert!(timeline[2].to.is_none());
    }
}
