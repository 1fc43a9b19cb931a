//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::repositories::{
    ChargePointRepository, ChargingSessionRepository, DeviceEventRepository, DeviceRepository,
    EvseRepository, IdTagRepository, MeterValueRepository, OrderRepository, RepositoryProvider,
};

use super::{
    SeaOrmChargePointRepository, SeaOrmChargingSessionRepository, SeaOrmDeviceEventRepository,
    SeaOrmDeviceRepository, SeaOrmEvseRepository, SeaOrmIdTagRepository,
    SeaOrmMeterValueRepository, SeaOrmOrderRepository,
};

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let cp = repos.charge_points().find_by_id("CP-001").await?;
/// let active = repos.sessions().find_active("CP-001", 1).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    devices: SeaOrmDeviceRepository,
    charge_points: SeaOrmChargePointRepository,
    evses: SeaOrmEvseRepository,
    sessions: SeaOrmChargingSessionRepository,
    meter_values: SeaOrmMeterValueRepository,
    device_events: SeaOrmDeviceEventRepository,
    id_tags: SeaOrmIdTagRepository,
    orders: SeaOrmOrderRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            devices: SeaOrmDeviceRepository::new(db.clone()),
            charge_points: SeaOrmChargePointRepository::new(db.clone()),
            evses: SeaOrmEvseRepository::new(db.clone()),
            sessions: SeaOrmChargingSessionRepository::new(db.clone()),
            meter_values: SeaOrmMeterValueRepository::new(db.clone()),
            device_events: SeaOrmDeviceEventRepository::new(db.clone()),
            id_tags: SeaOrmIdTagRepository::new(db.clone()),
            orders: SeaOrmOrderRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn devices(&self) -> &dyn DeviceRepository {
        &self.devices
    }

    fn charge_points(&self) -> &dyn ChargePointRepository {
        &self.charge_points
    }

    fn evses(&self) -> &dyn EvseRepository {
        &self.evses
    }

    fn sessions(&self) -> &dyn ChargingSessionRepository {
        &self.sessions
    }

    fn meter_values(&self) -> &dyn MeterValueRepository {
        &self.meter_values
    }

    fn device_events(&self) -> &dyn DeviceEventRepository {
        &self.device_events
    }

    fn id_tags(&self) -> &dyn IdTagRepository {
        &self.id_tags
    }

    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }
}
