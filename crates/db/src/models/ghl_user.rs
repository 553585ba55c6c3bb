use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ghl_user;

/// Local mirror of a GoHighLevel user. Rows only ever come from pull sync;
/// nothing in this system creates them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhlUser {
    pub id: Uuid,
    pub ghl_user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertGhlUser {
    pub ghl_user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GhlUser {
    fn from_model(model: ghl_user::Model) -> Self {
        Self {
            id: model.uuid,
            ghl_user_id: model.ghl_user_id,
            name: model.name,
            email: model.email,
            last_synced_at: model.last_synced_at.into(),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = ghl_user::Entity::find()
            .order_by_asc(ghl_user::Column::Name)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_ghl_user_id<C: ConnectionTrait>(
        db: &C,
        ghl_user_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = ghl_user::Entity::find()
            .filter(ghl_user::Column::GhlUserId.eq(ghl_user_id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Upsert keyed by the external user id. Refreshes last_synced_at on
    /// every call; name/email are overwritten with whatever the remote sent.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        data: &UpsertGhlUser,
    ) -> Result<Self, DbErr> {
        let existing = ghl_user::Entity::find()
            .filter(ghl_user::Column::GhlUserId.eq(data.ghl_user_id.as_str()))
            .one(db)
            .await?;

        let now = Utc::now();
        let model = match existing {
            Some(record) => {
                let mut active: ghl_user::ActiveModel = record.into();
                active.name = Set(data.name.clone());
                active.email = Set(data.email.clone());
                active.last_synced_at = Set(now.into());
                active.update(db).await?
            }
            None => {
                let active = ghl_user::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    ghl_user_id: Set(data.ghl_user_id.clone()),
                    name: Set(data.name.clone()),
                    email: Set(data.email.clone()),
                    last_synced_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(db).await?
            }
        };

        Ok(Self::from_model(model))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn upsert_by_external_id_does_not_duplicate() {
        let db = setup_db().await;

        let first = GhlUser::upsert(
            &db,
            &UpsertGhlUser {
                ghl_user_id: "ghl-user-1".to_string(),
                name: Some("Max Mustermann".to_string()),
                email: Some("max@example.com".to_string()),
            },
        )
        .await
        .unwrap();

        let second = GhlUser::upsert(
            &db,
            &UpsertGhlUser {
                ghl_user_id: "ghl-user-1".to_string(),
                name: Some("Max M.".to_string()),
                email: Some("max@example.com".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Max M."));
        assert_eq!(GhlUser::find_all(&db).await.unwrap().len(), 1);
        assert!(second.last_synced_at >= first.last_synced_at);
    }
}
