//! SeaORM implementation of DeviceRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use super::db_err;
use crate::domain::device::Device;
use crate::domain::repositories::DeviceRepository;
use crate::infrastructure::database::entities::device;
use crate::support::errors::{DomainError, DomainResult};

pub struct SeaOrmDeviceRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: device::Model) -> Device {
    Device {
        serial_number: m.serial_number,
        type_code: m.type_code,
        master_secret_encrypted: m.master_secret_encrypted,
        encryption_algorithm: m.encryption_algorithm,
        mqtt_client_id: m.mqtt_client_id,
        is_active: m.is_active,
        last_connected: m.last_connected,
        created_at: m.created_at,
    }
}

fn domain_to_active(d: Device) -> device::ActiveModel {
    device::ActiveModel {
        serial_number: Set(d.serial_number),
        type_code: Set(d.type_code),
        master_secret_encrypted: Set(d.master_secret_encrypted),
        encryption_algorithm: Set(d.encryption_algorithm),
        mqtt_client_id: Set(d.mqtt_client_id),
        is_active: Set(d.is_active),
        last_connected: Set(d.last_connected),
        created_at: Set(d.created_at),
    }
}

#[async_trait]
impl DeviceRepository for SeaOrmDeviceRepository {
    async fn save(&self, device: Device) -> DomainResult<()> {
        let exists = device::Entity::find_by_id(&device.serial_number)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();

        let model = domain_to_active(device);
        if exists {
            model.update(&self.db).await.map_err(db_err)?;
        } else {
            model.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Device>> {
        let model = device::Entity::find_by_id(serial)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<Device>> {
        let models = device::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update_last_connected(&self, serial: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let existing = device::Entity::find_by_id(serial)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound {
                entity: "Device",
                field: "serial_number",
                value: serial.to_string(),
            })?;

        let mut active: device::ActiveModel = existing.into();
        active.last_connected = Set(Some(at));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
