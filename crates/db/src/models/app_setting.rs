use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::app_setting, models::ids};

pub const GHL_API_TOKEN: &str = "ghl_api_token";
pub const GHL_LOCATION_ID: &str = "ghl_location_id";
pub const OPENAI_API_KEY: &str = "openai_api_key";

/// Key/value configuration row. Values are opaque secret strings; they are
/// returned as stored and never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSetting {
    pub id: Uuid,
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAppSetting {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub updated_by: Option<Uuid>,
}

impl AppSetting {
    fn from_model(model: app_setting::Model) -> Self {
        Self {
            id: model.uuid,
            key: model.key,
            value: model.value,
            description: model.description,
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = app_setting::Entity::find()
            .order_by_asc(app_setting::Column::Key)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn get_value<C: ConnectionTrait>(
        db: &C,
        key: &str,
    ) -> Result<Option<String>, DbErr> {
        let record = app_setting::Entity::find()
            .filter(app_setting::Column::Key.eq(key))
            .one(db)
            .await?;
        Ok(record.and_then(|model| model.value))
    }

    /// Upsert keyed by the setting key. Only caller-provided fields are
    /// written; an omitted description leaves the stored one alone.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        data: &UpsertAppSetting,
    ) -> Result<Self, DbErr> {
        let updated_by_user_id = match data.updated_by {
            Some(user_id) => ids::user_id_by_uuid(db, user_id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let existing = app_setting::Entity::find()
            .filter(app_setting::Column::Key.eq(data.key.as_str()))
            .one(db)
            .await?;

        let now = Utc::now();
        let model = match existing {
            Some(record) => {
                let mut active: app_setting::ActiveModel = record.into();
                active.value = Set(data.value.clone());
                if data.description.is_some() {
                    active.description = Set(data.description.clone());
                }
                if updated_by_user_id.is_some() {
                    active.updated_by_user_id = Set(updated_by_user_id);
                }
                active.updated_at = Set(now.into());
                active.update(db).await?
            }
            None => {
                let active = app_setting::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    key: Set(data.key.clone()),
                    value: Set(data.value.clone()),
                    description: Set(data.description.clone()),
                    updated_by_user_id: Set(updated_by_user_id),
                    updated_at: Set(now.into()),
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
    async fn upsert_by_key_preserves_unspecified_description() {
        let db = setup_db().await;

        AppSetting::upsert(
            &db,
            &UpsertAppSetting {
                key: GHL_API_TOKEN.to_string(),
                value: Some("secret-token".to_string()),
                description: Some("GoHighLevel API token".to_string()),
                updated_by: None,
            },
        )
        .await
        .unwrap();

        let updated = AppSetting::upsert(
            &db,
            &UpsertAppSetting {
                key: GHL_API_TOKEN.to_string(),
                value: Some("rotated-token".to_string()),
                description: None,
                updated_by: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.value.as_deref(), Some("rotated-token"));
        assert_eq!(
            updated.description.as_deref(),
            Some("GoHighLevel API token")
        );
        assert_eq!(AppSetting::find_all(&db).await.unwrap().len(), 1);
        assert_eq!(
            AppSetting::get_value(&db, GHL_API_TOKEN).await.unwrap().as_deref(),
            Some("rotated-token")
        );
    }

    #[tokio::test]
    async fn get_value_returns_none_for_unknown_key() {
        let db = setup_db().await;
        assert!(AppSetting::get_value(&db, GHL_LOCATION_ID).await.unwrap().is_none());
    }
}
