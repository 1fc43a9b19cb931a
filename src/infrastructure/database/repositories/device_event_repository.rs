//! SeaORM implementation of DeviceEventRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

use super::db_err;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::DeviceEventRepository;
use crate::infrastructure::database::entities::device_event;
use crate::support::errors::DomainResult;

pub struct SeaOrmDeviceEventRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: device_event::Model) -> DeviceEvent {
    DeviceEvent {
        id: m.id,
        charge_point_id: m.charge_point_id,
        evse_id: m.evse_id.map(|e| e as u32),
        kind: EventKind::parse(&m.kind).unwrap_or(EventKind::Error),
        payload: m.payload,
        status: m.status,
        previous_status: m.previous_status,
        timestamp: m.timestamp,
    }
}

#[async_trait]
impl DeviceEventRepository for SeaOrmDeviceEventRepository {
    async fn append(&self, event: DeviceEvent) -> DomainResult<()> {
        let active = device_event::ActiveModel {
            charge_point_id: Set(event.charge_point_id),
            evse_id: Set(event.evse_id.map(|e| e as i32)),
            kind: Set(event.kind.as_str().to_string()),
            payload: Set(event.payload),
            status: Set(event.status),
            previous_status: Set(event.previous_status),
            timestamp: Set(event.timestamp),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
        kind: Option<EventKind>,
    ) -> DomainResult<Vec<DeviceEvent>> {
        let mut query = device_event::Entity::find()
            .filter(device_event::Column::ChargePointId.eq(charge_point_id))
            .filter(device_event::Column::Timestamp.gte(since));
        if let Some(kind) = kind {
            query = query.filter(device_event::Column::Kind.eq(kind.as_str()));
        }
        let models = query
            .order_by_asc(device_event::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn latest_per_charge_point(&self) -> DomainResult<Vec<DeviceEvent>> {
        // Walk newest-first and keep the first row seen per charge point.
        let models = device_event::Entity::find()
            .order_by_desc(device_event::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut latest: HashMap<String, DeviceEvent> = HashMap::new();
        for model in models {
            let event = model_to_domain(model);
            latest
                .entry(event.charge_point_id.clone())
                .or_insert(event);
        }
        Ok(latest.into_values().collect())
    }
}
