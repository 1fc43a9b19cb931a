//! SeaORM implementation of ChargePointRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use super::db_err;
use crate::domain::charge_point::{ChargePoint, ConnectorStatus, Location, OperationalStatus};
use crate::domain::repositories::ChargePointRepository;
use crate::infrastructure::database::entities::charge_point;
use crate::support::errors::{DomainError, DomainResult};

pub struct SeaOrmChargePointRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargePointRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: &str) -> DomainResult<charge_point::Model> {
        charge_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound {
                entity: "ChargePoint",
                field: "id",
                value: id.to_string(),
            })
    }
}

fn model_to_domain(m: charge_point::Model) -> ChargePoint {
    ChargePoint {
        id: m.id,
        device_serial: m.device_serial,
        vendor: m.vendor,
        model: m.model,
        firmware_version: m.firmware_version,
        physical_status: ConnectorStatus::parse(&m.physical_status)
            .unwrap_or(ConnectorStatus::Unavailable),
        operational_status: OperationalStatus::parse(&m.operational_status)
            .unwrap_or(OperationalStatus::Enabled),
        last_seen: m.last_seen,
        location: Location {
            latitude: m.latitude,
            longitude: m.longitude,
            address: m.address,
        },
        price_per_kwh: m.price_per_kwh,
        charging_rate_kw: m.charging_rate_kw,
        registered_at: m.registered_at,
    }
}

fn domain_to_active(cp: ChargePoint) -> charge_point::ActiveModel {
    charge_point::ActiveModel {
        id: Set(cp.id),
        device_serial: Set(cp.device_serial),
        vendor: Set(cp.vendor),
        model: Set(cp.model),
        firmware_version: Set(cp.firmware_version),
        physical_status: Set(cp.physical_status.as_str().to_string()),
        operational_status: Set(cp.operational_status.as_str().to_string()),
        last_seen: Set(cp.last_seen),
        latitude: Set(cp.location.latitude),
        longitude: Set(cp.location.longitude),
        address: Set(cp.location.address),
        price_per_kwh: Set(cp.price_per_kwh),
        charging_rate_kw: Set(cp.charging_rate_kw),
        registered_at: Set(cp.registered_at),
    }
}

#[async_trait]
impl ChargePointRepository for SeaOrmChargePointRepository {
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<()> {
        domain_to_active(charge_point)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        self.find_model(&charge_point.id).await?;
        domain_to_active(charge_point)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargePoint>> {
        let model = charge_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        let models = charge_point::Entity::find()
            .order_by_asc(charge_point::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update_physical_status(&self, id: &str, status: ConnectorStatus) -> DomainResult<()> {
        let model = self.find_model(id).await?;
        let mut active: charge_point::ActiveModel = model.into();
        active.physical_status = Set(status.as_str().to_string());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_operational_status(
        &self,
        id: &str,
        status: OperationalStatus,
    ) -> DomainResult<()> {
        let model = self.find_model(id).await?;
        let mut active: charge_point::ActiveModel = model.into();
        active.operational_status = Set(status.as_str().to_string());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_last_seen(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let model = self.find_model(id).await?;
        let mut active: charge_point::ActiveModel = model.into();
        active.last_seen = Set(Some(at));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_location(&self, id: &str, location: Location) -> DomainResult<()> {
        let model = self.find_model(id).await?;
        let mut active: charge_point::ActiveModel = model.into();
        active.latitude = Set(location.latitude);
        active.longitude = Set(location.longitude);
        active.address = Set(location.address);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_pricing(
        &self,
        id: &str,
        price_per_kwh: Decimal,
        charging_rate_kw: Option<f64>,
    ) -> DomainResult<()> {
        let model = self.find_model(id).await?;
        let mut active: charge_point::ActiveModel = model.into();
        active.price_per_kwh = Set(Some(price_per_kwh));
        if charging_rate_kw.is_some() {
            active.charging_rate_kw = Set(charging_rate_kw);
        }
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
