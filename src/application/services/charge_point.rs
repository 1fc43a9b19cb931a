//! Charge point business logic

use chrono::Utc;
use tracing::info;

use crate::domain::charge_point::{
    sanitize_charge_point_id, ChargePoint, ConnectorStatus, Location,
};
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::id_tag::TagStatus;
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::support::errors::{DomainError, DomainResult};

/// Outcome of a BootNotification registration attempt.
#[derive(Debug, Clone)]
pub struct BootOutcome {
    pub charge_point_id: String,
    pub accepted: bool,
    pub newly_provisioned: bool,
}

/// Service for charge point registration, status and authorization.
pub struct ChargePointService {
    repos: SharedRepositoryProvider,
    reject_unknown: bool,
}

impl ChargePointService {
    pub fn new(repos: SharedRepositoryProvider, reject_unknown: bool) -> Self {
        Self {
            repos,
            reject_unknown,
        }
    }

    /// Register a charge point from a BootNotification, or refresh the
    /// stored identity of a known one.
    ///
    /// Unknown chargers are auto-provisioned (with a sanitized id) unless
    /// the deployment rejects unknown charge points.
    pub async fn register_from_boot(
        &self,
        charge_point_id: &str,
        vendor: &str,
        model: &str,
        serial_number: Option<&str>,
        firmware_version: Option<&str>,
    ) -> DomainResult<BootOutcome> {
        if let Some(mut existing) = self.repos.charge_points().find_by_id(charge_point_id).await? {
            existing.vendor = Some(vendor.to_string());
            existing.model = Some(model.to_string());
            if existing.device_serial.is_none() {
                existing.device_serial = serial_number.map(String::from);
            }
            existing.firmware_version = firmware_version.map(String::from);
            existing.touch();
            self.repos.charge_points().update(existing).await?;
            return Ok(BootOutcome {
                charge_point_id: charge_point_id.to_string(),
                accepted: true,
                newly_provisioned: false,
            });
        }

        if self.reject_unknown {
            info!(charge_point_id, "Rejecting BootNotification from unknown charge point");
            return Ok(BootOutcome {
                charge_point_id: charge_point_id.to_string(),
                accepted: false,
                newly_provisioned: false,
            });
        }

        let Some(clean_id) = sanitize_charge_point_id(charge_point_id) else {
            return Ok(BootOutcome {
                charge_point_id: charge_point_id.to_string(),
                accepted: false,
                newly_provisioned: false,
            });
        };
        if clean_id != charge_point_id {
            info!(
                original = charge_point_id,
                sanitized = clean_id.as_str(),
                "Charge point id sanitized on first boot"
            );
            // The sanitized id may already be provisioned; treat as known.
            if self.repos.charge_points().find_by_id(&clean_id).await?.is_some() {
                return Box::pin(self.register_from_boot(
                    &clean_id,
                    vendor,
                    model,
                    serial_number,
                    firmware_version,
                ))
                .await;
            }
        }

        let mut cp = ChargePoint::new(clean_id.clone());
        cp.vendor = Some(vendor.to_string());
        cp.model = Some(model.to_string());
        cp.device_serial = serial_number.map(String::from);
        cp.firmware_version = firmware_version.map(String::from);
        cp.touch();
        self.repos.charge_points().save(cp).await?;

        info!(charge_point_id = clean_id.as_str(), vendor, model, "Charge point auto-provisioned");

        Ok(BootOutcome {
            charge_point_id: clean_id,
            accepted: true,
            newly_provisioned: true,
        })
    }

    /// Record a heartbeat: last_seen in the store.
    pub async fn heartbeat(&self, charge_point_id: &str) -> DomainResult<()> {
        self.repos
            .charge_points()
            .update_last_seen(charge_point_id, Utc::now())
            .await
    }

    /// Apply a StatusNotification to the connector and derive the charge
    /// point's aggregate physical status. Returns the new aggregate.
    pub async fn update_connector_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        reported: ConnectorStatus,
        error_code: Option<String>,
    ) -> DomainResult<ConnectorStatus> {
        let has_error = error_code.as_deref().map_or(false, |c| c != "NoError");
        // A connector reporting an error is treated as faulted regardless of
        // the status field it claims.
        let effective = if has_error {
            ConnectorStatus::Faulted
        } else {
            reported
        };

        let previous = self
            .repos
            .evses()
            .find(charge_point_id, connector_id)
            .await?
            .map(|e| e.status);

        // Connector 0 addresses the whole station in OCPP 1.6
        if connector_id == 0 {
            self.repos
                .charge_points()
                .update_physical_status(charge_point_id, effective)
                .await?;
        } else {
            self.repos
                .evses()
                .upsert_status(charge_point_id, connector_id, effective, error_code.clone())
                .await?;

            let aggregate = self.aggregate_status(charge_point_id).await?;
            self.repos
                .charge_points()
                .update_physical_status(charge_point_id, aggregate)
                .await?;
        }

        self.repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::StatusChange)
                    .with_evse(connector_id)
                    .with_status_change(
                        effective.as_str(),
                        previous.map(|p| p.as_str().to_string()),
                    ),
            )
            .await?;

        let aggregate = self
            .repos
            .charge_points()
            .find_by_id(charge_point_id)
            .await?
            .map(|cp| cp.physical_status)
            .unwrap_or(effective);
        Ok(aggregate)
    }

    /// Derive the station status from its connectors: Faulted only when ALL
    /// connectors are faulted; Charging when any is; Available when any is.
    async fn aggregate_status(&self, charge_point_id: &str) -> DomainResult<ConnectorStatus> {
        let evses = self.repos.evses().find_for_charge_point(charge_point_id).await?;
        if evses.is_empty() {
            return Ok(ConnectorStatus::Unavailable);
        }
        if evses.iter().all(|e| e.is_faulted()) {
            return Ok(ConnectorStatus::Faulted);
        }
        if evses
            .iter()
            .any(|e| e.status == ConnectorStatus::Charging)
        {
            return Ok(ConnectorStatus::Charging);
        }
        if evses
            .iter()
            .any(|e| e.status == ConnectorStatus::Available)
        {
            return Ok(ConnectorStatus::Available);
        }
        Ok(evses[0].status)
    }

    /// Authorization verdict for a tag: stored status with expiry applied,
    /// `Invalid` when the tag is not in the store at all.
    pub async fn authorize(&self, tag: &str) -> DomainResult<TagStatus> {
        let verdict = match self.repos.id_tags().find(tag).await? {
            Some(id_tag) => id_tag.effective_status(Utc::now()),
            None => TagStatus::Invalid,
        };
        Ok(verdict)
    }

    pub async fn get(&self, charge_point_id: &str) -> DomainResult<ChargePoint> {
        self.repos
            .charge_points()
            .find_by_id(charge_point_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: charge_point_id.to_string(),
            })
    }

    pub async fn update_location(
        &self,
        charge_point_id: &str,
        location: Location,
    ) -> DomainResult<()> {
        self.repos
            .charge_points()
            .update_location(charge_point_id, location)
            .await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id_tag::IdTag;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;

    fn service(reject_unknown: bool) -> ChargePointService {
        ChargePointService::new(InMemoryRepositoryProvider::shared(), reject_unknown)
    }

    #[tokio::test]
    async fn boot_auto_provisions_unknown_charger() {
        let svc = service(false);
        let outcome = svc
            .register_from_boot("CP-001", "Vendor", "Model", Some("SN1"), Some("1.0"))
            .await
            .unwrap();
        assert!(outcome.accepted);
        assert!(outcome.newly_provisioned);

        let cp = svc.get("CP-001").await.unwrap();
        assert_eq!(cp.vendor.as_deref(), Some("Vendor"));
        assert!(!cp.is_configured());
    }

    #[tokio::test]
    async fn boot_rejected_when_unknown_and_policy_strict() {
        let svc = service(true);
        let outcome = svc
            .register_from_boot("CP-001", "V", "M", None, None)
            .await
            .unwrap();
        assert!(!outcome.accepted);
        assert!(svc.get("CP-001").await.is_err());
    }

    #[tokio::test]
    async fn boot_sanitizes_charger_id() {
        let svc = service(false);
        let outcome = svc
            .register_from_boot("CP/00*1", "V", "M", None, None)
            .await
            .unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.charge_point_id, "CP001");
        assert!(svc.get("CP001").await.is_ok());
    }

    #[tokio::test]
    async fn second_boot_updates_identity() {
        let svc = service(false);
        svc.register_from_boot("CP-001", "V", "M", None, Some("1.0"))
            .await
            .unwrap();
        let outcome = svc
            .register_from_boot("CP-001", "V", "M", None, Some("2.0"))
            .await
            .unwrap();
        assert!(!outcome.newly_provisioned);
        let cp = svc.get("CP-001").await.unwrap();
        assert_eq!(cp.firmware_version.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn connector_error_forces_faulted() {
        let svc = service(false);
        svc.register_from_boot("CP-001", "V", "M", None, None)
            .await
            .unwrap();
        let aggregate = svc
            .update_connector_status(
                "CP-001",
                1,
                ConnectorStatus::Available,
                Some("GroundFailure".into()),
            )
            .await
            .unwrap();
        assert_eq!(aggregate, ConnectorStatus::Faulted);
    }

    #[tokio::test]
    async fn aggregate_faulted_only_when_all_connectors_faulted() {
        let svc = service(false);
        svc.register_from_boot("CP-001", "V", "M", None, None)
            .await
            .unwrap();
        svc.update_connector_status("CP-001", 1, ConnectorStatus::Faulted, Some("HighTemperature".into()))
            .await
            .unwrap();
        let aggregate = svc
            .update_connector_status("CP-001", 2, ConnectorStatus::Available, None)
            .await
            .unwrap();
        assert_eq!(aggregate, ConnectorStatus::Available);

        let aggregate = svc
            .update_connector_status("CP-001", 2, ConnectorStatus::Faulted, Some("PowerMeterFailure".into()))
            .await
            .unwrap();
        assert_eq!(aggregate, ConnectorStatus::Faulted);
    }

    #[tokio::test]
    async fn authorize_unknown_tag_is_invalid() {
        let svc = service(false);
        assert_eq!(svc.authorize("nope").await.unwrap(), TagStatus::Invalid);
    }

    #[tokio::test]
    async fn authorize_known_tag_returns_stored_status() {
        let repos = InMemoryRepositoryProvider::shared();
        let mut tag = IdTag::new("T1");
        tag.status = TagStatus::Blocked;
        repos.id_tags().save(tag).await.unwrap();
        let svc = ChargePointService::new(repos, false);
        assert_eq!(svc.authorize("T1").await.unwrap(), TagStatus::Blocked);
    }
}
