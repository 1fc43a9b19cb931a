//! Device entity: physical unit identity and MQTT credential material

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub serial_number: String,

    /// Device family code used in MQTT topics ("zcf", "abb", …)
    pub type_code: String,

    /// Encrypted master secret; never leaves the store in clear
    #[sea_orm(column_type = "Text")]
    pub master_secret_encrypted: String,

    pub encryption_algorithm: String,

    #[sea_orm(nullable, unique)]
    pub mqtt_client_id: Option<String>,

    pub is_active: bool,

    #[sea_orm(nullable)]
    pub last_connected: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charge_point::Entity")]
    ChargePoints,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
