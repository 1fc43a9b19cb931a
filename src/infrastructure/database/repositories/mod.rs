//! SeaORM repository implementations

mod charge_point_repository;
mod charging_session_repository;
mod device_event_repository;
mod device_repository;
mod evse_repository;
mod id_tag_repository;
mod meter_value_repository;
mod order_repository;
mod repository_provider;

pub use charge_point_repository::SeaOrmChargePointRepository;
pub use charging_session_repository::SeaOrmChargingSessionRepository;
pub use device_event_repository::SeaOrmDeviceEventRepository;
pub use device_repository::SeaOrmDeviceRepository;
pub use evse_repository::SeaOrmEvseRepository;
pub use id_tag_repository::SeaOrmIdTagRepository;
pub use meter_value_repository::SeaOrmMeterValueRepository;
pub use order_repository::SeaOrmOrderRepository;
pub use repository_provider::SeaOrmRepositoryProvider;

use crate::support::errors::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Store(e.to_string())
}
