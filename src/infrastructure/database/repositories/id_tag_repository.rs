//! SeaORM implementation of IdTagRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use super::db_err;
use crate::domain::id_tag::{IdTag, TagStatus};
use crate::domain::repositories::IdTagRepository;
use crate::infrastructure::database::entities::id_tag;
use crate::support::errors::DomainResult;

pub struct SeaOrmIdTagRepository {
    db: DatabaseConnection,
}

impl SeaOrmIdTagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: id_tag::Model) -> IdTag {
    IdTag {
        tag: m.tag,
        status: TagStatus::parse(&m.status).unwrap_or(TagStatus::Invalid),
        parent_tag: m.parent_tag,
        expiry: m.expiry,
        created_at: m.created_at,
    }
}

#[async_trait]
impl IdTagRepository for SeaOrmIdTagRepository {
    async fn save(&self, tag: IdTag) -> DomainResult<()> {
        let exists = id_tag::Entity::find_by_id(&tag.tag)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();

        let active = id_tag::ActiveModel {
            tag: Set(tag.tag),
            status: Set(tag.status.as_str().to_string()),
            parent_tag: Set(tag.parent_tag),
            expiry: Set(tag.expiry),
            created_at: Set(tag.created_at),
        };
        if exists {
            active.update(&self.db).await.map_err(db_err)?;
        } else {
            active.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn find(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        let model = id_tag::Entity::find_by_id(tag)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<IdTag>> {
        let models = id_tag::Entity::find()
            .order_by_asc(id_tag::Column::Tag)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
