//! Device event entity (append-only audit log)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Not a foreign key: events may be recorded for chargers that were
    /// never provisioned (decode errors, rejected boots)
    pub charge_point_id: String,

    #[sea_orm(nullable)]
    pub evse_id: Option<i32>,

    pub kind: String,

    #[sea_orm(nullable, column_type = "Json")]
    pub payload: Option<Json>,

    #[sea_orm(nullable)]
    pub status: Option<String>,

    #[sea_orm(nullable)]
    pub previous_status: Option<String>,

    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
