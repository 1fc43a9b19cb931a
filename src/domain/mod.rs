//! Core business entities, value objects and repository traits.
//!
//! Everything in here is persistence-agnostic; SeaORM models and the
//! in-memory test store both map to these types.

pub mod charge_point;
pub mod charging_session;
pub mod device;
pub mod device_event;
pub mod evse;
pub mod id_tag;
pub mod meter_value;
pub mod order;
pub mod repositories;

pub use charge_point::{ChargePoint, ConnectorStatus, Location, OperationalStatus};
pub use charging_session::{ChargingSession, SessionStatus};
pub use device::Device;
pub use device_event::{DeviceEvent, EventKind};
pub use evse::{ConnectorType, Evse};
pub use id_tag::{IdTag, TagStatus};
pub use meter_value::MeterSample;
pub use order::{Order, OrderStatus};
pub use repositories::{
    ChargePointRepository, ChargingSessionRepository, DeviceEventRepository, DeviceRepository,
    EvseRepository, IdTagRepository, MeterValueRepository, OrderRepository, RepositoryProvider,
    SharedRepositoryProvider,
};

pub use crate::support::errors::{DomainError, DomainResult};
