//! SeaORM implementation of OrderRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::db_err;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::repositories::OrderRepository;
use crate::infrastructure::database::entities::order;
use crate::support::errors::DomainResult;

pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: order::Model) -> Order {
    Order {
        id: m.id,
        session_id: m.session_id,
        charge_point_id: m.charge_point_id,
        id_tag: m.id_tag,
        user_id: m.user_id,
        energy_kwh: m.energy_kwh,
        duration_minutes: m.duration_minutes,
        price_per_kwh: m.price_per_kwh,
        total_amount: m.total_amount,
        status: OrderStatus::parse(&m.status).unwrap_or(OrderStatus::Pending),
        created_at: m.created_at,
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn save(&self, o: Order) -> DomainResult<()> {
        let active = order::ActiveModel {
            id: Set(o.id),
            session_id: Set(o.session_id),
            charge_point_id: Set(o.charge_point_id),
            id_tag: Set(o.id_tag),
            user_id: Set(o.user_id),
            energy_kwh: Set(o.energy_kwh),
            duration_minutes: Set(o.duration_minutes),
            price_per_kwh: Set(o.price_per_kwh),
            total_amount: Set(o.total_amount),
            status: Set(o.status.as_str().to_string()),
            created_at: Set(o.created_at),
        };
        active.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Order>> {
        let model = order::Entity::find()
            .filter(order::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_for_charge_point(&self, charge_point_id: &str) -> DomainResult<Vec<Order>> {
        let models = order::Entity::find()
            .filter(order::Column::ChargePointId.eq(charge_point_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<Order>> {
        let models = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
