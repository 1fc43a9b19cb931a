//! Charge point entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charge_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(nullable)]
    pub device_serial: Option<String>,

    #[sea_orm(nullable)]
    pub vendor: Option<String>,

    #[sea_orm(nullable)]
    pub model: Option<String>,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,

    /// OCPP physical status: Available, Preparing, Charging, …, Faulted
    pub physical_status: String,

    /// Operator availability: ENABLED, DISABLED, MAINTENANCE
    pub operational_status: String,

    #[sea_orm(nullable)]
    pub last_seen: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    #[sea_orm(nullable)]
    pub address: Option<String>,

    /// COP per kWh, two decimals
    #[sea_orm(nullable, column_type = "Decimal(Some((10, 2)))")]
    pub price_per_kwh: Option<Decimal>,

    /// Nominal charging rate in kW
    #[sea_orm(nullable)]
    pub charging_rate_kw: Option<f64>,

    pub registered_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceSerial",
        to = "super::device::Column::SerialNumber"
    )]
    Device,

    #[sea_orm(has_many = "super::evse::Entity")]
    Evses,

    #[sea_orm(has_many = "super::charging_session::Entity")]
    ChargingSessions,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::evse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evses.def()
    }
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
