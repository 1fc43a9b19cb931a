//! Meter value entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meter_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning charging session; a sample never exists without one
    pub session_id: i32,

    #[sea_orm(nullable)]
    pub connector_id: Option<i32>,

    pub timestamp: DateTimeUtc,

    /// Energy register value (Wh)
    pub value: i32,

    /// Full sampledValue array as received
    #[sea_orm(nullable, column_type = "Json")]
    pub sampled_value: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::SessionId",
        to = "super::charging_session::Column::Id"
    )]
    Session,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
