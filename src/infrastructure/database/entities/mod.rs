//! SeaORM entity models

pub mod charge_point;
pub mod charging_session;
pub mod device;
pub mod device_event;
pub mod evse;
pub mod id_tag;
pub mod meter_value;
pub mod order;
