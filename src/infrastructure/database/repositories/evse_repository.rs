//! SeaORM implementation of EvseRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::db_err;
use crate::domain::charge_point::ConnectorStatus;
use crate::domain::evse::{ConnectorType, Evse};
use crate::domain::repositories::EvseRepository;
use crate::infrastructure::database::entities::evse;
use crate::support::errors::DomainResult;

pub struct SeaOrmEvseRepository {
    db: DatabaseConnection,
}

impl SeaOrmEvseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: evse::Model) -> Evse {
    Evse {
        id: m.id,
        charge_point_id: m.charge_point_id,
        connector_id: m.connector_id as u32,
        connector_type: ConnectorType::parse(&m.connector_type).unwrap_or(ConnectorType::Type2),
        status: ConnectorStatus::parse(&m.status).unwrap_or(ConnectorStatus::Unavailable),
        last_error_code: m.last_error_code,
        updated_at: m.updated_at,
    }
}

#[async_trait]
impl EvseRepository for SeaOrmEvseRepository {
    async fn upsert_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: ConnectorStatus,
        error_code: Option<String>,
    ) -> DomainResult<Evse> {
        let existing = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .filter(evse::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let model = match existing {
            Some(model) => {
                let mut active: evse::ActiveModel = model.into();
                active.status = Set(status.as_str().to_string());
                active.last_error_code = Set(error_code);
                active.updated_at = Set(Utc::now());
                active.update(&self.db).await.map_err(db_err)?
            }
            None => {
                let active = evse::ActiveModel {
                    charge_point_id: Set(charge_point_id.to_string()),
                    connector_id: Set(connector_id as i32),
                    connector_type: Set(ConnectorType::Type2.as_str().to_string()),
                    status: Set(status.as_str().to_string()),
                    last_error_code: Set(error_code),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(db_err)?
            }
        };

        Ok(model_to_domain(model))
    }

    async fn find(&self, charge_point_id: &str, connector_id: u32) -> DomainResult<Option<Evse>> {
        let model = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .filter(evse::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Evse>> {
        let models = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(evse::Column::ConnectorId)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
