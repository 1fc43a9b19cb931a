//! Charging session lifecycle and meter ingest.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::billing::BillingService;
use crate::domain::charging_session::{ChargingSession, SessionStatus};
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::meter_value::MeterSample;
use crate::domain::order::Order;
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::support::errors::{DomainError, DomainResult};

/// One extracted meter reading from a MeterValues entry.
#[derive(Debug, Clone)]
pub struct MeterReading {
    pub connector_id: Option<u32>,
    pub timestamp: DateTime<Utc>,
    pub value_wh: i32,
    pub sampled_value: Option<Value>,
}

/// Session lifecycle service: start, stop, meter ingest, stale cleanup.
pub struct ChargingService {
    repos: SharedRepositoryProvider,
    billing: BillingService,
}

impl ChargingService {
    pub fn new(repos: SharedRepositoryProvider) -> Self {
        let billing = BillingService::new(repos.clone());
        Self { repos, billing }
    }

    /// Open a session with a server-assigned transaction id.
    /// Fails with `Conflict` when the connector already has an active one.
    pub async fn start_transaction(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        id_tag: &str,
        meter_start: i32,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<ChargingSession> {
        let session = ChargingSession::new(
            charge_point_id,
            connector_id,
            0, // store assigns the next transaction id
            id_tag,
            meter_start,
            timestamp,
        );
        let session = self.repos.sessions().start(session).await?;

        self.repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::TransactionStart)
                    .with_evse(connector_id)
                    .with_payload(serde_json::json!({
                        "transactionId": session.transaction_id,
                        "idTag": id_tag,
                        "meterStart": meter_start,
                    })),
            )
            .await?;

        info!(
            charge_point_id,
            connector_id,
            transaction_id = session.transaction_id,
            id_tag,
            "Transaction started"
        );
        Ok(session)
    }

    /// Close the active session for this transaction id and settle it.
    ///
    /// Returns `None` when no matching active session exists — a double stop
    /// or a replay after reconnect; the caller answers Accepted either way.
    pub async fn stop_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        meter_stop: i32,
        timestamp: DateTime<Utc>,
        reason: Option<String>,
    ) -> DomainResult<Option<(ChargingSession, Option<Order>)>> {
        let closed = self
            .repos
            .sessions()
            .complete(charge_point_id, transaction_id, timestamp, meter_stop, reason)
            .await?;

        let Some(session) = closed else {
            self.repos
                .device_events()
                .append(
                    DeviceEvent::new(charge_point_id, EventKind::StopWithoutSession)
                        .with_payload(serde_json::json!({
                            "transactionId": transaction_id,
                            "meterStop": meter_stop,
                        })),
                )
                .await?;
            info!(
                charge_point_id,
                transaction_id, "StopTransaction without a matching active session"
            );
            return Ok(None);
        };

        self.repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::TransactionStop)
                    .with_evse(session.evse_id)
                    .with_payload(serde_json::json!({
                        "transactionId": transaction_id,
                        "meterStop": meter_stop,
                        "energyWh": session.energy_wh(),
                    })),
            )
            .await?;

        let order = self.billing.settle(&session).await?;

        info!(
            charge_point_id,
            transaction_id,
            energy_wh = ?session.energy_wh(),
            settled = order.is_some(),
            "Transaction stopped"
        );
        Ok(Some((session, order)))
    }

    /// Persist meter readings for an active transaction.
    ///
    /// Readings for unknown or closed transactions are discarded (never
    /// stored as orphans) and audited. Timestamps older than the latest
    /// stored sample are clamped to `latest + 1 ms` and a clock-skew event
    /// is recorded.
    pub async fn record_meter_values(
        &self,
        charge_point_id: &str,
        transaction_id: Option<i32>,
        readings: Vec<MeterReading>,
    ) -> DomainResult<usize> {
        let Some(transaction_id) = transaction_id else {
            self.audit_discarded(charge_point_id, None, readings.len()).await?;
            return Ok(0);
        };

        let session = self
            .repos
            .sessions()
            .find_by_transaction(charge_point_id, transaction_id)
            .await?;
        let session = match session {
            Some(s) if s.is_active() => s,
            _ => {
                self.audit_discarded(charge_point_id, Some(transaction_id), readings.len())
                    .await?;
                return Ok(0);
            }
        };

        let mut last_stored = self.repos.meter_values().latest_timestamp(session.id).await?;
        let mut stored = 0usize;

        for reading in readings {
            let mut timestamp = reading.timestamp;
            if let Some(last) = last_stored {
                if timestamp < last {
                    let clamped = last + Duration::milliseconds(1);
                    self.repos
                        .device_events()
                        .append(
                            DeviceEvent::new(charge_point_id, EventKind::ClockSkew).with_payload(
                                serde_json::json!({
                                    "transactionId": transaction_id,
                                    "reported": timestamp.to_rfc3339(),
                                    "clamped": clamped.to_rfc3339(),
                                }),
                            ),
                        )
                        .await?;
                    warn!(
                        charge_point_id,
                        transaction_id,
                        reported = %timestamp,
                        "Meter sample timestamp behind stored history; clamping"
                    );
                    timestamp = clamped;
                }
            }

            let mut sample = MeterSample::new(session.id, timestamp, reading.value_wh);
            sample.connector_id = reading.connector_id;
            sample.sampled_value = reading.sampled_value;
            self.repos.meter_values().append(sample).await?;
            last_stored = Some(timestamp);
            stored += 1;
        }

        Ok(stored)
    }

    async fn audit_discarded(
        &self,
        charge_point_id: &str,
        transaction_id: Option<i32>,
        count: usize,
    ) -> DomainResult<()> {
        warn!(
            charge_point_id,
            ?transaction_id,
            count, "Discarding meter samples without an active session"
        );
        self.repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::MeterValues).with_payload(
                    serde_json::json!({
                        "discarded": count,
                        "transactionId": transaction_id,
                    }),
                ),
            )
            .await
    }

    /// A connector going Available while its session is still active means
    /// the stop was lost: force-close the session as interrupted.
    pub async fn interrupt_abandoned(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<ChargingSession>> {
        let Some(session) = self
            .repos
            .sessions()
            .find_active(charge_point_id, connector_id)
            .await?
        else {
            return Ok(None);
        };

        self.repos
            .sessions()
            .force_close(session.id, SessionStatus::Interrupted, Utc::now())
            .await?;
        warn!(
            charge_point_id,
            connector_id,
            transaction_id = session.transaction_id,
            "Active session interrupted: connector reported Available"
        );
        Ok(Some(session))
    }

    /// Close every active session older than the stale cutoff.
    pub async fn interrupt_stale_sessions(&self, stale_after_hours: u32) -> DomainResult<usize> {
        let cutoff = Utc::now() - Duration::hours(stale_after_hours as i64);
        let stale = self.repos.sessions().find_active_started_before(cutoff).await?;
        let count = stale.len();
        for session in stale {
            self.repos
                .sessions()
                .force_close(session.id, SessionStatus::Interrupted, Utc::now())
                .await?;
            warn!(
                charge_point_id = session.charge_point_id.as_str(),
                transaction_id = session.transaction_id,
                started = %session.start_time,
                "Stale active session interrupted"
            );
        }
        Ok(count)
    }

    /// The unique active transaction for a charge point, for RemoteStop
    /// without an explicit transaction id.
    pub async fn sole_active_transaction(&self, charge_point_id: &str) -> DomainResult<i32> {
        let active = self
            .repos
            .sessions()
            .find_active_for_charge_point(charge_point_id)
            .await?;
        match active.as_slice() {
            [] => Err(DomainError::NoActiveSession(charge_point_id.to_string())),
            [only] => Ok(only.transaction_id),
            _ => Err(DomainError::AmbiguousSession(charge_point_id.to_string())),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::charge_point::ChargePoint;
    use crate::domain::repositories::RepositoryProvider;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    async fn setup() -> (Arc<InMemoryRepositoryProvider>, ChargingService) {
        let repos = InMemoryRepositoryProvider::shared();
        let mut cp = ChargePoint::new("CP-001");
        cp.price_per_kwh = Some(Decimal::new(270000, 2));
        repos.charge_points().save(cp).await.unwrap();
        let svc = ChargingService::new(repos.clone());
        (repos, svc)
    }

    #[tokio::test]
    async fn start_then_stop_settles_order() {
        let (repos, svc) = setup().await;
        let session = svc
            .start_transaction("CP-001", 1, "T1", 1000, Utc::now())
            .await
            .unwrap();
        assert_eq!(session.transaction_id, 1);

        let (closed, order) = svc
            .stop_transaction("CP-001", 1, 1500, Utc::now(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Completed);
        assert_eq!(closed.energy_wh(), Some(500));
        let order = order.unwrap();
        assert_eq!(order.total_amount, Decimal::new(135000, 2));
        assert!(repos.orders().find_by_session(closed.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn double_stop_is_idempotent() {
        let (_repos, svc) = setup().await;
        svc.start_transaction("CP-001", 1, "T1", 1000, Utc::now())
            .await
            .unwrap();
        assert!(svc
            .stop_transaction("CP-001", 1, 1500, Utc::now(), None)
            .await
            .unwrap()
            .is_some());
        // Second stop: no session to close, no mutation
        assert!(svc
            .stop_transaction("CP-001", 1, 1600, Utc::now(), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn concurrent_start_on_same_connector_conflicts() {
        let (_repos, svc) = setup().await;
        svc.start_transaction("CP-001", 1, "T1", 1000, Utc::now())
            .await
            .unwrap();
        let err = svc
            .start_transaction("CP-001", 1, "T2", 1100, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn meter_values_for_unknown_transaction_are_discarded() {
        let (repos, svc) = setup().await;
        let stored = svc
            .record_meter_values(
                "CP-001",
                Some(99),
                vec![MeterReading {
                    connector_id: Some(1),
                    timestamp: Utc::now(),
                    value_wh: 1200,
                    sampled_value: None,
                }],
            )
            .await
            .unwrap();
        assert_eq!(stored, 0);
        // No orphan samples
        assert!(repos.meter_values().find_for_session(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn late_meter_timestamp_is_clamped_not_rejected() {
        let (repos, svc) = setup().await;
        let session = svc
            .start_transaction("CP-001", 1, "T1", 1000, Utc::now())
            .await
            .unwrap();

        let t0 = Utc::now();
        svc.record_meter_values(
            "CP-001",
            Some(session.transaction_id),
            vec![MeterReading {
                connector_id: Some(1),
                timestamp: t0,
                value_wh: 1200,
                sampled_value: None,
            }],
        )
        .await
        .unwrap();

        // A sample 10 s in the past is clamped to t0 + 1 ms
        let stored = svc
            .record_meter_values(
                "CP-001",
                Some(session.transaction_id),
                vec![MeterReading {
                    connector_id: Some(1),
                    timestamp: t0 - Duration::seconds(10),
                    value_wh: 1300,
                    sampled_value: None,
                }],
            )
            .await
            .unwrap();
        assert_eq!(stored, 1);

        let samples = repos.meter_values().find_for_session(session.id).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].timestamp, t0 + Duration::milliseconds(1));
        assert!(samples[1].timestamp >= samples[0].timestamp);
    }

    #[tokio::test]
    async fn interrupt_abandoned_closes_active_session() {
        let (repos, svc) = setup().await;
        let session = svc
            .start_transaction("CP-001", 1, "T1", 1000, Utc::now())
            .await
            .unwrap();
        let interrupted = svc.interrupt_abandoned("CP-001", 1).await.unwrap().unwrap();
        assert_eq!(interrupted.transaction_id, session.transaction_id);

        let reloaded = repos
            .sessions()
            .find_by_transaction("CP-001", session.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, SessionStatus::Interrupted);
    }

    #[tokio::test]
    async fn sole_active_transaction_requires_exactly_one() {
        let (_repos, svc) = setup().await;
        assert!(matches!(
            svc.sole_active_transaction("CP-001").await.unwrap_err(),
            DomainError::NoActiveSession(_)
        ));

        svc.start_transaction("CP-001", 1, "T1", 0, Utc::now()).await.unwrap();
        assert_eq!(svc.sole_active_transaction("CP-001").await.unwrap(), 1);

        svc.start_transaction("CP-001", 2, "T2", 0, Utc::now()).await.unwrap();
        assert!(matches!(
            svc.sole_active_transaction("CP-001").await.unwrap_err(),
            DomainError::AmbiguousSession(_)
        ));
    }

    #[tokio::test]
    async fn stale_sessions_are_interrupted() {
        let (repos, svc) = setup().await;
        let old_start = Utc::now() - Duration::hours(30);
        let session = repos
            .sessions()
            .start(ChargingSession::new("CP-001", 1, 0, "T1", 0, old_start))
            .await
            .unwrap();

        let count = svc.interrupt_stale_sessions(24).await.unwrap();
        assert_eq!(count, 1);
        let reloaded = repos
            .sessions()
            .find_by_transaction("CP-001", session.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, SessionStatus::Interrupted);
    }
}
