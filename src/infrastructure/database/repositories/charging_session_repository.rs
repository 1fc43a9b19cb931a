//! SeaORM implementation of ChargingSessionRepository
//!
//! StartTransaction and StopTransaction are the contended paths: both run
//! inside a store transaction so the one-active-per-connector invariant and
//! the conditional close survive concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use super::db_err;
use crate::domain::charging_session::{ChargingSession, SessionStatus};
use crate::domain::repositories::ChargingSessionRepository;
use crate::infrastructure::database::entities::charging_session;
use crate::support::errors::{DomainError, DomainResult};

pub struct SeaOrmChargingSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargingSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charging_session::Model) -> ChargingSession {
    ChargingSession {
        id: m.id,
        charge_point_id: m.charge_point_id,
        evse_id: m.evse_id as u32,
        transaction_id: m.transaction_id,
        id_tag: m.id_tag,
        user_id: m.user_id,
        start_time: m.start_time,
        end_time: m.end_time,
        meter_start: m.meter_start,
        meter_stop: m.meter_stop,
        status: SessionStatus::parse(&m.status).unwrap_or(SessionStatus::Interrupted),
        stop_reason: m.stop_reason,
    }
}

#[async_trait]
impl ChargingSessionRepository for SeaOrmChargingSessionRepository {
    async fn next_transaction_id(&self) -> DomainResult<i32> {
        let max: Option<i32> = charging_session::Entity::find()
            .select_only()
            .column_as(charging_session::Column::TransactionId.max(), "max_id")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?
            .flatten();
        Ok(max.unwrap_or(0) + 1)
    }

    async fn start(&self, session: ChargingSession) -> DomainResult<ChargingSession> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let active_exists = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(session.charge_point_id.as_str()))
            .filter(charging_session::Column::EvseId.eq(session.evse_id as i32))
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_some();

        if active_exists {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::Conflict(format!(
                "connector {}/{} already has an active session",
                session.charge_point_id, session.evse_id
            )));
        }

        // Assign the next server-global transaction id inside the same
        // transaction when the caller did not pin one.
        let transaction_id = if session.transaction_id > 0 {
            session.transaction_id
        } else {
            let max: Option<i32> = charging_session::Entity::find()
                .select_only()
                .column_as(charging_session::Column::TransactionId.max(), "max_id")
                .into_tuple()
                .one(&txn)
                .await
                .map_err(db_err)?
                .flatten();
            max.unwrap_or(0) + 1
        };

        let active = charging_session::ActiveModel {
            charge_point_id: Set(session.charge_point_id.clone()),
            evse_id: Set(session.evse_id as i32),
            transaction_id: Set(transaction_id),
            id_tag: Set(session.id_tag.clone()),
            user_id: Set(session.user_id.clone()),
            start_time: Set(session.start_time),
            end_time: Set(None),
            meter_start: Set(session.meter_start),
            meter_stop: Set(None),
            status: Set(SessionStatus::Active.as_str().to_string()),
            stop_reason: Set(None),
            ..Default::default()
        };
        let inserted = active.insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(model_to_domain(inserted))
    }

    async fn complete(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
        reason: Option<String>,
    ) -> DomainResult<Option<ChargingSession>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::TransactionId.eq(transaction_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .one(&txn)
            .await
            .map_err(db_err)?;

        let Some(model) = existing else {
            txn.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        let mut session = model_to_domain(model.clone());
        session.complete(end_time, meter_stop, reason);

        let mut active: charging_session::ActiveModel = model.into();
        active.end_time = Set(session.end_time);
        active.meter_stop = Set(session.meter_stop);
        active.status = Set(session.status.as_str().to_string());
        active.stop_reason = Set(session.stop_reason.clone());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(Some(session))
    }

    async fn force_close(
        &self,
        session_id: i32,
        status: SessionStatus,
        end_time: DateTime<Utc>,
    ) -> DomainResult<()> {
        let existing = charging_session::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound {
                entity: "ChargingSession",
                field: "id",
                value: session_id.to_string(),
            })?;

        let clamped_end = end_time.max(existing.start_time);
        let mut active: charging_session::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.end_time = Set(Some(clamped_end));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active(
        &self,
        charge_point_id: &str,
        evse_id: u32,
    ) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::EvseId.eq(evse_id as i32))
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_for_charge_point(
        &self,
        charge_point_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_for_charge_point(
        &self,
        charge_point_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::StartTime.gte(since))
            .order_by_desc(charging_session::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .order_by_desc(charging_session::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_active_started_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::Status.eq(SessionStatus::Active.as_str()))
            .filter(charging_session::Column::StartTime.lt(cutoff))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
