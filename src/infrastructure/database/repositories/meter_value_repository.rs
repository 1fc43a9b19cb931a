//! SeaORM implementation of MeterValueRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::db_err;
use crate::domain::meter_value::MeterSample;
use crate::domain::repositories::MeterValueRepository;
use crate::infrastructure::database::entities::meter_value;
use crate::support::errors::DomainResult;

pub struct SeaOrmMeterValueRepository {
    db: DatabaseConnection,
}

impl SeaOrmMeterValueRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: meter_value::Model) -> MeterSample {
    MeterSample {
        id: m.id,
        session_id: m.session_id,
        connector_id: m.connector_id.map(|c| c as u32),
        timestamp: m.timestamp,
        value_wh: m.value,
        sampled_value: m.sampled_value,
    }
}

#[async_trait]
impl MeterValueRepository for SeaOrmMeterValueRepository {
    async fn append(&self, sample: MeterSample) -> DomainResult<()> {
        let active = meter_value::ActiveModel {
            session_id: Set(sample.session_id),
            connector_id: Set(sample.connector_id.map(|c| c as i32)),
            timestamp: Set(sample.timestamp),
            value: Set(sample.value_wh),
            sampled_value: Set(sample.sampled_value),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn latest_timestamp(&self, session_id: i32) -> DomainResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = meter_value::Entity::find()
            .select_only()
            .column_as(meter_value::Column::Timestamp.max(), "max_ts")
            .filter(meter_value::Column::SessionId.eq(session_id))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?
            .flatten();
        Ok(latest)
    }

    async fn find_for_session(&self, session_id: i32) -> DomainResult<Vec<MeterSample>> {
        let models = meter_value::Entity::find()
            .filter(meter_value::Column::SessionId.eq(session_id))
            .order_by_asc(meter_value::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
