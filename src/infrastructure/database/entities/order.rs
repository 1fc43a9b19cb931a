//! Order entity: commercial settlement of a completed session

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub session_id: i32,

    pub charge_point_id: String,

    pub id_tag: String,

    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub energy_kwh: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub duration_minutes: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price_per_kwh: Decimal,

    /// Total amount, COP with two decimals
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_amount: Decimal,

    /// pending, completed, cancelled
    pub status: String,

    pub created_at: DateTimeUtc,
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
